use std::fmt;

use statrs::distribution::{ContinuousCDF, Normal, StudentsT};
use thiserror::Error;

// ---------------------------------------------------------------------------
// Test kinds and alternatives
// ---------------------------------------------------------------------------

/// Significance threshold for the accept/reject narration. Fixed; never a
/// parameter of the tests themselves.
pub const ALPHA: f64 = 0.05;

/// Alternative hypothesis. Matches SciPy semantics: `Greater` means the
/// first sample tends to larger values than the second.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Alternative {
    TwoSided,
    Greater,
    Less,
}

impl Alternative {
    pub const ALL: [Alternative; 3] = [
        Alternative::TwoSided,
        Alternative::Greater,
        Alternative::Less,
    ];

    pub fn label(&self) -> &'static str {
        match self {
            Alternative::TwoSided => "two-sided",
            Alternative::Greater => "greater",
            Alternative::Less => "less",
        }
    }
}

/// Supported two-sample hypothesis tests.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TestKind {
    WelchT,
    MannWhitneyU,
}

impl TestKind {
    pub const ALL: [TestKind; 2] = [TestKind::WelchT, TestKind::MannWhitneyU];

    pub fn name(&self) -> &'static str {
        match self {
            TestKind::WelchT => "Welch's t-test",
            TestKind::MannWhitneyU => "Mann-Whitney U test",
        }
    }
}

/// Degenerate or incompatible samples. Reported to the user, never fatal.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum TestError {
    #[error("invalid input: {0}")]
    InvalidInput(String),
}

/// Outcome of a test run: the statistic, the p-value, and the derived
/// decision at `ALPHA`.
#[derive(Debug, Clone, PartialEq)]
pub struct TestReport {
    pub kind: TestKind,
    pub statistic: f64,
    pub p_value: f64,
    pub reject: bool,
}

impl fmt::Display for TestReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let decision = if self.reject {
            "reject H0"
        } else {
            "do not reject H0"
        };
        write!(
            f,
            "{}: statistic = {:.4}, p = {:.4} → {decision} at α = {ALPHA}",
            self.kind.name(),
            self.statistic,
            self.p_value
        )
    }
}

// ---------------------------------------------------------------------------
// Dispatch
// ---------------------------------------------------------------------------

/// Run the chosen test on two numeric samples. Non-finite values (missing
/// cells, NaN) are dropped from each sample before computation; no state is
/// kept between invocations.
pub fn dispatch(
    kind: TestKind,
    sample_a: &[f64],
    sample_b: &[f64],
    alternative: Alternative,
) -> Result<TestReport, TestError> {
    let a: Vec<f64> = sample_a.iter().copied().filter(|v| v.is_finite()).collect();
    let b: Vec<f64> = sample_b.iter().copied().filter(|v| v.is_finite()).collect();

    let (statistic, p_value) = match kind {
        TestKind::WelchT => welch_t(&a, &b, alternative)?,
        TestKind::MannWhitneyU => mann_whitney_u(&a, &b, alternative)?,
    };

    log::debug!(
        "{} (n = {}, {}; {}): stat {statistic:.4}, p {p_value:.4}",
        kind.name(),
        a.len(),
        b.len(),
        alternative.label()
    );

    Ok(TestReport {
        kind,
        statistic,
        p_value,
        reject: p_value < ALPHA,
    })
}

// ---------------------------------------------------------------------------
// Welch's t-test
// ---------------------------------------------------------------------------

fn mean(xs: &[f64]) -> f64 {
    xs.iter().sum::<f64>() / xs.len() as f64
}

/// Sample variance (ddof = 1). Assumes xs.len() >= 2.
fn var_sample(xs: &[f64], mean: f64) -> f64 {
    let ss: f64 = xs.iter().map(|&v| (v - mean) * (v - mean)).sum();
    ss / (xs.len() - 1) as f64
}

/// Unequal-variance two-sample mean comparison with Welch–Satterthwaite
/// degrees of freedom.
fn welch_t(a: &[f64], b: &[f64], alternative: Alternative) -> Result<(f64, f64), TestError> {
    let (na, nb) = (a.len(), b.len());
    if na < 2 || nb < 2 {
        return Err(TestError::InvalidInput(format!(
            "each sample needs at least 2 observations (got {na} and {nb})"
        )));
    }

    let (ma, mb) = (mean(a), mean(b));
    let (va, vb) = (var_sample(a, ma), var_sample(b, mb));

    let sa = va / na as f64;
    let sb = vb / nb as f64;
    let se = (sa + sb).sqrt();
    if se == 0.0 {
        return Err(TestError::InvalidInput(
            "both samples have zero variance".into(),
        ));
    }

    let t = (ma - mb) / se;
    let df = (sa + sb) * (sa + sb)
        / (sa * sa / (na as f64 - 1.0) + sb * sb / (nb as f64 - 1.0));

    let dist = StudentsT::new(0.0, 1.0, df)
        .map_err(|e| TestError::InvalidInput(e.to_string()))?;
    let p = match alternative {
        Alternative::TwoSided => 2.0 * (1.0 - dist.cdf(t.abs())),
        Alternative::Greater => 1.0 - dist.cdf(t),
        Alternative::Less => dist.cdf(t),
    };

    Ok((t, p.clamp(0.0, 1.0)))
}

// ---------------------------------------------------------------------------
// Mann-Whitney U test
// ---------------------------------------------------------------------------

/// Midranks over the pooled samples: tied values share the mean of the
/// rank positions they occupy.
fn midranks(pooled: &[f64]) -> Vec<f64> {
    let n = pooled.len();
    let mut order: Vec<usize> = (0..n).collect();
    order.sort_by(|&i, &j| pooled[i].total_cmp(&pooled[j]));

    let mut ranks = vec![0.0; n];
    let mut i = 0;
    while i < n {
        let mut j = i;
        while j + 1 < n && pooled[order[j + 1]] == pooled[order[i]] {
            j += 1;
        }
        // Positions i..=j (0-based) hold a tie group; 1-based midrank.
        let midrank = (i + j) as f64 / 2.0 + 1.0;
        for &idx in &order[i..=j] {
            ranks[idx] = midrank;
        }
        i = j + 1;
    }
    ranks
}

/// Non-parametric two-sample rank comparison, tie-corrected normal
/// approximation with continuity correction.
fn mann_whitney_u(a: &[f64], b: &[f64], alternative: Alternative) -> Result<(f64, f64), TestError> {
    let (n1, n2) = (a.len(), b.len());
    if n1 == 0 || n2 == 0 {
        return Err(TestError::InvalidInput(format!(
            "both samples must be non-empty (got {n1} and {n2})"
        )));
    }

    let mut pooled = Vec::with_capacity(n1 + n2);
    pooled.extend_from_slice(a);
    pooled.extend_from_slice(b);
    let ranks = midranks(&pooled);

    let r1: f64 = ranks[..n1].iter().sum();
    let u1 = r1 - (n1 * (n1 + 1)) as f64 / 2.0;

    let n = (n1 + n2) as f64;
    let mu = (n1 * n2) as f64 / 2.0;

    // Tie correction term: sum over tie groups of t³ - t.
    let mut sorted = pooled.clone();
    sorted.sort_by(f64::total_cmp);
    let mut tie_term = 0.0;
    let mut i = 0;
    while i < sorted.len() {
        let mut j = i;
        while j + 1 < sorted.len() && sorted[j + 1] == sorted[i] {
            j += 1;
        }
        let t = (j - i + 1) as f64;
        tie_term += t * t * t - t;
        i = j + 1;
    }

    let variance = (n1 * n2) as f64 / 12.0 * ((n + 1.0) - tie_term / (n * (n - 1.0)));
    if variance <= 0.0 {
        return Err(TestError::InvalidInput(
            "all pooled observations are tied".into(),
        ));
    }
    let sigma = variance.sqrt();

    let normal = Normal::new(0.0, 1.0).map_err(|e| TestError::InvalidInput(e.to_string()))?;
    let p = match alternative {
        Alternative::TwoSided => {
            let z = ((u1 - mu).abs() - 0.5) / sigma;
            2.0 * (1.0 - normal.cdf(z))
        }
        Alternative::Greater => {
            let z = (u1 - mu - 0.5) / sigma;
            1.0 - normal.cdf(z)
        }
        Alternative::Less => {
            let z = (u1 - mu + 0.5) / sigma;
            normal.cdf(z)
        }
    };

    Ok((u1, p.clamp(0.0, 1.0)))
}

// ---------------------------------------------------------------------------
// Correlation
// ---------------------------------------------------------------------------

/// Pearson correlation matrix over row-aligned series (NaN marks a missing
/// cell). Pairwise-complete: a row is used for a pair only when both
/// entries are finite. Degenerate pairs (fewer than two complete rows, or
/// zero variance) are NaN. The matrix is symmetric with a unit diagonal.
pub fn correlation_matrix(series: &[Vec<f64>]) -> Vec<Vec<f64>> {
    let k = series.len();
    let mut out = vec![vec![f64::NAN; k]; k];

    for i in 0..k {
        out[i][i] = 1.0;
        for j in (i + 1)..k {
            let r = pearson(&series[i], &series[j]);
            out[i][j] = r;
            out[j][i] = r;
        }
    }
    out
}

fn pearson(xs: &[f64], ys: &[f64]) -> f64 {
    let pairs: Vec<(f64, f64)> = xs
        .iter()
        .zip(ys)
        .filter(|(x, y)| x.is_finite() && y.is_finite())
        .map(|(&x, &y)| (x, y))
        .collect();

    if pairs.len() < 2 {
        return f64::NAN;
    }

    let n = pairs.len() as f64;
    let mx = pairs.iter().map(|(x, _)| x).sum::<f64>() / n;
    let my = pairs.iter().map(|(_, y)| y).sum::<f64>() / n;

    let mut sxy = 0.0;
    let mut sxx = 0.0;
    let mut syy = 0.0;
    for (x, y) in &pairs {
        let dx = x - mx;
        let dy = y - my;
        sxy += dx * dy;
        sxx += dx * dx;
        syy += dy * dy;
    }

    if sxx == 0.0 || syy == 0.0 {
        return f64::NAN;
    }
    sxy / (sxx * syy).sqrt()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_kind_names() {
        assert_eq!(TestKind::WelchT.name(), "Welch's t-test");
        assert_eq!(TestKind::MannWhitneyU.name(), "Mann-Whitney U test");
    }

    #[test]
    fn welch_identical_samples_do_not_reject() {
        let a = [1.0, 2.0, 3.0, 4.0, 5.0];
        let report = dispatch(TestKind::WelchT, &a, &a, Alternative::TwoSided).unwrap();
        assert!(report.statistic.abs() < 1e-12);
        assert!(report.p_value > 0.99);
        assert!(!report.reject);
    }

    #[test]
    fn welch_clearly_shifted_samples_reject() {
        let a = [10.1, 10.2, 9.9, 10.0, 10.3, 9.8];
        let b = [0.1, 0.2, -0.1, 0.0, 0.3, -0.2];
        let report = dispatch(TestKind::WelchT, &a, &b, Alternative::TwoSided).unwrap();
        assert!(report.p_value < 0.001);
        assert!(report.reject);
    }

    #[test]
    fn welch_one_sided_direction() {
        let hi = [5.0, 6.0, 7.0, 8.0];
        let lo = [1.0, 2.0, 3.0, 4.0];
        let greater = dispatch(TestKind::WelchT, &hi, &lo, Alternative::Greater).unwrap();
        let less = dispatch(TestKind::WelchT, &hi, &lo, Alternative::Less).unwrap();
        assert!(greater.p_value < 0.05);
        assert!(less.p_value > 0.95);
    }

    #[test]
    fn welch_drops_non_finite_then_runs() {
        // n = 3 per side after dropping the non-finite entries.
        let age = [20.0, 25.0, 30.0, f64::NAN];
        let score = [1.5, 2.5, f64::NAN, 4.0];
        let report = dispatch(TestKind::WelchT, &age, &score, Alternative::TwoSided).unwrap();
        assert!((0.0..=1.0).contains(&report.p_value));
        // Means 25 vs 2.67 with tiny samples: decision must be consistent.
        assert_eq!(report.reject, report.p_value < ALPHA);
    }

    #[test]
    fn welch_too_few_observations() {
        assert_eq!(
            dispatch(TestKind::WelchT, &[1.0], &[1.0, 2.0], Alternative::TwoSided),
            Err(TestError::InvalidInput(
                "each sample needs at least 2 observations (got 1 and 2)".into()
            ))
        );
    }

    #[test]
    fn welch_zero_variance_rejected() {
        let flat = [2.0, 2.0, 2.0];
        assert!(dispatch(TestKind::WelchT, &flat, &flat, Alternative::TwoSided).is_err());
    }

    #[test]
    fn midranks_handle_ties() {
        let ranks = midranks(&[1.0, 2.0, 2.0, 3.0]);
        assert_eq!(ranks, vec![1.0, 2.5, 2.5, 4.0]);
    }

    #[test]
    fn mann_whitney_symmetric_under_no_shift() {
        let a = [1.0, 3.0, 5.0, 7.0, 9.0];
        let b = [2.0, 4.0, 6.0, 8.0, 10.0];
        let report = dispatch(TestKind::MannWhitneyU, &a, &b, Alternative::TwoSided).unwrap();
        assert!(report.p_value > 0.5);
        assert!(!report.reject);
    }

    #[test]
    fn mann_whitney_detects_separation() {
        let a = [11.0, 12.0, 13.0, 14.0, 15.0, 16.0, 17.0, 18.0];
        let b = [1.0, 2.0, 3.0, 4.0, 5.0, 6.0, 7.0, 8.0];
        let report = dispatch(TestKind::MannWhitneyU, &a, &b, Alternative::TwoSided).unwrap();
        // Complete separation: U = n1 * n2.
        assert!((report.statistic - 64.0).abs() < 1e-12);
        assert!(report.reject);

        let greater = dispatch(TestKind::MannWhitneyU, &a, &b, Alternative::Greater).unwrap();
        assert!(greater.p_value < 0.01);
        let less = dispatch(TestKind::MannWhitneyU, &a, &b, Alternative::Less).unwrap();
        assert!(less.p_value > 0.99);
    }

    #[test]
    fn mann_whitney_empty_sample_rejected() {
        assert!(matches!(
            dispatch(TestKind::MannWhitneyU, &[], &[1.0], Alternative::TwoSided),
            Err(TestError::InvalidInput(_))
        ));
    }

    #[test]
    fn mann_whitney_all_tied_rejected() {
        let flat = [3.0, 3.0, 3.0];
        assert!(matches!(
            dispatch(TestKind::MannWhitneyU, &flat, &flat, Alternative::TwoSided),
            Err(TestError::InvalidInput(_))
        ));
    }

    #[test]
    fn correlation_of_exact_linear_relation() {
        let x = vec![1.0, 2.0, 3.0, 4.0];
        let up = vec![2.0, 4.0, 6.0, 8.0];
        let down = vec![8.0, 6.0, 4.0, 2.0];
        let m = correlation_matrix(&[x, up, down]);
        assert!((m[0][1] - 1.0).abs() < 1e-12);
        assert!((m[0][2] + 1.0).abs() < 1e-12);
        assert!((m[1][2] + 1.0).abs() < 1e-12);
        assert!((m[2][2] - 1.0).abs() < 1e-12);
        assert_eq!(m[0][1], m[1][0]);
    }

    #[test]
    fn correlation_skips_incomplete_pairs() {
        let x = vec![1.0, 2.0, f64::NAN, 4.0];
        let y = vec![1.0, f64::NAN, 3.0, 4.0];
        // Only rows 0 and 3 are complete for the pair: still a valid r.
        let m = correlation_matrix(&[x, y]);
        assert!((m[0][1] - 1.0).abs() < 1e-12);
    }

    #[test]
    fn correlation_degenerate_pairs_are_nan() {
        let x = vec![1.0, 2.0, 3.0];
        let flat = vec![5.0, 5.0, 5.0];
        let m = correlation_matrix(&[x, flat]);
        assert!(m[0][1].is_nan());
    }
}
