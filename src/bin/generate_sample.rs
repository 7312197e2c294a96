/// Minimal deterministic PRNG (xoshiro256**)
struct SimpleRng {
    state: [u64; 4],
}

impl SimpleRng {
    fn new(seed: u64) -> Self {
        let mut s = [0u64; 4];
        let mut x = seed;
        for slot in &mut s {
            x = x.wrapping_mul(6364136223846793005).wrapping_add(1);
            *slot = x;
        }
        SimpleRng { state: s }
    }

    fn next_u64(&mut self) -> u64 {
        let result = (self.state[1].wrapping_mul(5))
            .rotate_left(7)
            .wrapping_mul(9);
        let t = self.state[1] << 17;
        self.state[2] ^= self.state[0];
        self.state[3] ^= self.state[1];
        self.state[1] ^= self.state[2];
        self.state[0] ^= self.state[3];
        self.state[2] ^= t;
        self.state[3] = self.state[3].rotate_left(45);
        result
    }

    fn next_f64(&mut self) -> f64 {
        (self.next_u64() >> 11) as f64 / (1u64 << 53) as f64
    }

    /// Box-Muller transform for normal distribution
    fn gauss(&mut self, mean: f64, std_dev: f64) -> f64 {
        let u1 = self.next_f64().max(1e-15);
        let u2 = self.next_f64();
        let z = (-2.0 * u1.ln()).sqrt() * (2.0 * std::f64::consts::PI * u2).cos();
        mean + std_dev * z
    }
}

/// Calcium-style transient: flat until `onset`, fast rise, slow decay.
fn response(t: f64, onset: f64, amplitude: f64, decay: f64) -> f64 {
    if t < onset {
        return 0.0;
    }
    let dt = t - onset;
    amplitude * (1.0 - (-dt / 5.0).exp()) * (-dt / decay).exp()
}

fn main() {
    let mut rng = SimpleRng::new(42);

    // 120 reads, one every 2 s
    let times: Vec<f64> = (0..120).map(|i| i as f64 * 2.0).collect();
    let onset = 60.0;

    let letters = ["A", "B"];
    let mut wells: Vec<(String, Vec<String>)> = Vec::new();
    for (li, letter) in letters.iter().enumerate() {
        for number in 1..=12u32 {
            let label = format!("{letter}{number}");
            // A12 stands in for an empty well: the reader reports zeros.
            if label == "A12" {
                wells.push((label, vec!["0".to_string(); times.len()]));
                continue;
            }
            let baseline = 1_000.0 + 50.0 * li as f64 + 10.0 * number as f64;
            let amplitude = 0.2 * number as f64;
            let values = times
                .iter()
                .map(|&t| {
                    let f = baseline * (1.0 + response(t, onset, amplitude, 60.0));
                    format!("{:.0}", f + rng.gauss(0.0, 8.0))
                })
                .collect();
            wells.push((label, values));
        }
    }

    let output_path = "sample_export.csv";
    let mut writer = csv::WriterBuilder::new()
        .flexible(true)
        .from_path(output_path)
        .expect("Failed to create output file");

    let preamble: [&[&str]; 7] = [
        &["Plate reader export"],
        &["Instrument", "SimReader 2000"],
        &["Protocol", "Kinetic fluorescence"],
        &["Excitation", "485 nm"],
        &["Emission", "520 nm"],
        &[],
        &[],
    ];
    for row in preamble {
        writer.write_record(row).expect("Failed to write preamble");
    }

    let time_row: Vec<String> = times.iter().map(|t| format!("{t}")).collect();
    let type_row = vec!["Raw".to_string(); times.len()];
    let comment_row = vec![String::new(); times.len()];
    let header_rows = [
        ("Comment", &comment_row),
        ("Time [s]", &time_row),
        ("Type", &type_row),
    ];
    for (label, values) in header_rows {
        let record: Vec<&str> = ["", label]
            .into_iter()
            .chain(values.iter().map(String::as_str))
            .collect();
        writer.write_record(record).expect("Failed to write header row");
    }
    for (label, values) in &wells {
        let record: Vec<&str> = ["", label.as_str()]
            .into_iter()
            .chain(values.iter().map(String::as_str))
            .collect();
        writer.write_record(record).expect("Failed to write well row");
    }
    writer.flush().expect("Failed to flush output");

    println!(
        "Wrote {} wells ({} reads each) to {output_path}; time row label at B9",
        wells.len(),
        times.len()
    );
}
