use super::engine::CalibrationError;

/// Least-squares line `y = slope * x + intercept`.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct LinearFit {
    pub slope: f64,
    pub intercept: f64,
}

/// Ordinary least-squares fit of a degree 1 polynomial.
///
/// Repeated x values are independent points. Fails when fewer than two points
/// are given, when every x is equal, or when a value is not finite.
pub fn fit_line(points: &[(f64, f64)]) -> Result<LinearFit, CalibrationError> {
    if points.len() < 2 {
        return Err(CalibrationError::DegenerateFit);
    }
    if points.iter().any(|(x, y)| !x.is_finite() || !y.is_finite()) {
        return Err(CalibrationError::NonFinite("trend input"));
    }

    let n = points.len() as f64;
    let mean_x = points.iter().map(|(x, _)| x).sum::<f64>() / n;
    let mean_y = points.iter().map(|(_, y)| y).sum::<f64>() / n;

    // Centered sums keep the fit stable when day indexes get large.
    let (sxx, sxy) = points.iter().fold((0.0, 0.0), |(sxx, sxy), (x, y)| {
        let dx = x - mean_x;
        (dx.mul_add(dx, sxx), dx.mul_add(y - mean_y, sxy))
    });

    if sxx.abs() < f64::EPSILON {
        return Err(CalibrationError::DegenerateFit);
    }

    let slope = sxy / sxx;
    let intercept = slope.mul_add(-mean_x, mean_y);

    if !slope.is_finite() || !intercept.is_finite() {
        return Err(CalibrationError::NonFinite("trend slope"));
    }

    Ok(LinearFit { slope, intercept })
}
