/// Theil-Sen line fit: median of pairwise slopes, then median intercept
///
/// Scratch space is kept between fits so the per-symbol path does not
/// allocate once the largest point count has been seen.
#[derive(Debug, Default, Clone)]
pub struct TheilSen {
    scratch: Vec<f32>,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Line {
    pub slope: f32,
    pub yint: f32,
}

impl Line {
    pub fn at(&self, x: f32) -> f32 {
        self.yint + self.slope * x
    }
}

impl TheilSen {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn fit(&mut self, x: &[f32], y: &[f32]) -> Line {
        let n = x.len().min(y.len());
        self.scratch.clear();
        for i in 0..n {
            for j in i + 1..n {
                if x[j] != x[i] {
                    self.scratch.push((y[j] - y[i]) / (x[j] - x[i]));
                }
            }
        }
        let slope = median(&mut self.scratch);
        self.scratch.clear();
        self.scratch.extend((0..n).map(|i| y[i] - slope * x[i]));
        let yint = median(&mut self.scratch);
        Line { slope, yint }
    }
}

// upper median, zero for an empty set
fn median(v: &mut [f32]) -> f32 {
    if v.is_empty() {
        return 0.0;
    }
    let mid = v.len() / 2;
    let (_, m, _) = v.select_nth_unstable_by(mid, |a, b| a.total_cmp(b));
    *m
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_exact_line() {
        let x: Vec<f32> = (0..20).map(|i| i as f32).collect();
        let y: Vec<f32> = x.iter().map(|v| 0.25 * v - 1.0).collect();
        let line = TheilSen::new().fit(&x, &y);
        assert!((line.slope - 0.25).abs() < 1e-6);
        assert!((line.yint + 1.0).abs() < 1e-6);
        assert!((line.at(4.0)).abs() < 1e-5);
    }

    #[test]
    fn test_ignores_outliers() {
        let x: Vec<f32> = (-10..10).map(|i| i as f32).collect();
        let mut y: Vec<f32> = x.iter().map(|v| -0.01 * v + 0.3).collect();
        y[3] = 3.0;
        y[11] = -3.0;
        y[17] = 2.5;
        let line = TheilSen::new().fit(&x, &y);
        assert!((line.slope + 0.01).abs() < 1e-3, "slope {}", line.slope);
        assert!((line.yint - 0.3).abs() < 1e-2, "yint {}", line.yint);
    }

    #[test]
    fn test_degenerate_input() {
        let line = TheilSen::new().fit(&[], &[]);
        assert_eq!(line, Line { slope: 0.0, yint: 0.0 });
        let line = TheilSen::new().fit(&[1.0, 1.0], &[2.0, 4.0]);
        assert_eq!(line.slope, 0.0);
    }
}
