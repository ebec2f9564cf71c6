//! Writes `sample_data.csv`: a small mixed-type dataset with missing
//! values, for exercising the explorer by hand.

use serde::Serialize;

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

#[derive(Serialize)]
struct Row {
    id: i64,
    group: &'static str,
    operator: &'static str,
    dose: f64,
    /// None serializes as an empty field, i.e. a missing value.
    response: Option<f64>,
    passed: bool,
}

fn main() {
    let mut rng = SimpleRng::new(42);

    let groups = [("control", 10.0), ("treated", 12.5), ("placebo", 10.3)];
    let operators = ["Alice", "Bob"];
    let doses = [0.5, 1.0, 2.0, 5.0];

    let output_path = "sample_data.csv";
    let mut writer = csv::Writer::from_path(output_path).expect("Failed to create output file");

    let mut row_id: i64 = 0;
    for &(group, base) in &groups {
        for &dose in &doses {
            for &operator in &operators {
                for _ in 0..5 {
                    // Roughly 5% of responses go missing.
                    let response = if rng.next_f64() < 0.05 {
                        None
                    } else {
                        Some(rng.gauss(base + dose * 0.8, 1.2))
                    };
                    let passed = response.is_some_and(|r| r > base);

                    writer
                        .serialize(Row {
                            id: row_id,
                            group,
                            operator,
                            dose,
                            response,
                            passed,
                        })
                        .expect("Failed to write row");
                    row_id += 1;
                }
            }
        }
    }

    writer.flush().expect("Failed to flush output");
    println!("Wrote {row_id} rows to {output_path}");
}
