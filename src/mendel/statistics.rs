

pub fn mean (v: &[f64]) -> f64 {
    if v.is_empty() { return 0.0 };
    v.iter().sum::<f64>() / v.len() as f64
}

pub fn standard_deviation (v: &[f64]) -> f64 {
    if v.is_empty() { return 0.0 };
    let m = mean(v);
    (v.iter()
      .map(|&x| (x - m).powi(2))
      .sum::<f64>() / v.len() as f64).sqrt()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn mean_of_empty_is_zero () {
        assert_eq!(mean(&[]), 0.0);
    }

    #[test]
    fn mean_and_stddev () {
        let v = vec![2.0, 4.0, 4.0, 4.0, 5.0, 5.0, 7.0, 9.0];
        assert_eq!(mean(&v), 5.0);
        assert_eq!(standard_deviation(&v), 2.0);
    }
}
