/// Logistic sigmoid, `1 / (1 + e^-x)`.
pub fn sigmoid(x: f64) -> f64 {
    1.0 / (1.0 + (-x).exp())
}

/// Derivative of the sigmoid with respect to the function at x.
/// Takes the activation `a_x = sigmoid(x)` rather than `x`, so it is
/// expressed as `a_x * (1-a_x)` instead of `sigmoid(x)(1-sigmoid(x))`.
pub fn dsigmoid(a_x: f64) -> f64 {
    a_x * (1.0 - a_x)
}
