//! Normalized Jacobi polynomials.
//!
//! P_n^{(α,β)}(x) is orthogonal on [-1, 1] with weight (1-x)^α (1+x)^β. The
//! normalized variant satisfies
//!
//! ∫_{-1}^{1} (1-x)^α (1+x)^β P_m(x) P_n(x) dx = δ_{mn}
//!
//! and is the building block of the orthonormal simplex bases. With α = β = 0
//! it reduces to the orthonormal Legendre polynomials sqrt((2n+1)/2) P_n.

/// Γ(n + 1) = n! for a non-negative integer.
fn factorial(n: usize) -> f64 {
    (1..=n).fold(1.0, |acc, k| acc * k as f64)
}

/// Evaluate the normalized Jacobi polynomial P_n^{(α,β)}(x).
///
/// Uses the three-term recurrence for the normalized polynomials:
///
/// x P_i = a_i P_{i-1} + b_i P_i + a_{i+1} P_{i+1}
pub fn jacobi(alpha: usize, beta: usize, n: usize, x: f64) -> f64 {
    let a = alpha as f64;
    let b = beta as f64;

    let gamma0 = 2f64.powf(a + b + 1.0) / (a + b + 1.0) * factorial(alpha) * factorial(beta)
        / factorial(alpha + beta);
    let p0 = 1.0 / gamma0.sqrt();
    if n == 0 {
        return p0;
    }

    let gamma1 = (a + 1.0) * (b + 1.0) / (a + b + 3.0) * gamma0;
    let p1 = ((a + b + 2.0) * x / 2.0 + (a - b) / 2.0) / gamma1.sqrt();
    if n == 1 {
        return p1;
    }

    let mut a_old = 2.0 / (2.0 + a + b) * ((a + 1.0) * (b + 1.0) / (a + b + 3.0)).sqrt();
    let mut p_prev = p0;
    let mut p_curr = p1;

    for i in 1..n {
        let i = i as f64;
        let h1 = 2.0 * i + a + b;
        let a_new = 2.0 / (h1 + 2.0)
            * ((i + 1.0) * (i + 1.0 + a + b) * (i + 1.0 + a) * (i + 1.0 + b)
                / (h1 + 1.0)
                / (h1 + 3.0))
                .sqrt();
        let b_new = -(a * a - b * b) / h1 / (h1 + 2.0);
        let p_next = (-a_old * p_prev + (x - b_new) * p_curr) / a_new;

        a_old = a_new;
        p_prev = p_curr;
        p_curr = p_next;
    }

    p_curr
}

/// Derivative of the normalized Jacobi polynomial.
///
/// d/dx P_n^{(α,β)} = sqrt(n (n + α + β + 1)) P_{n-1}^{(α+1,β+1)}
pub fn grad_jacobi(alpha: usize, beta: usize, n: usize, x: f64) -> f64 {
    if n == 0 {
        return 0.0;
    }
    let scale = ((n * (n + alpha + beta + 1)) as f64).sqrt();
    scale * jacobi(alpha + 1, beta + 1, n - 1, x)
}

/// Orthonormal Legendre polynomial sqrt((2n+1)/2) P_n(x) and its derivative.
pub fn legendre_normalized_with_derivative(n: usize, x: f64) -> (f64, f64) {
    (jacobi(0, 0, n, x), grad_jacobi(0, 0, n, x))
}

/// Evaluate the (unnormalized) Legendre polynomial P_n(x) and P'_n(x).
///
/// Recurrence: (k+1) P_{k+1} = (2k+1) x P_k - k P_{k-1}. The derivative uses
/// P'_n = n (x P_n - P_{n-1}) / (x² - 1) away from the endpoints.
pub fn legendre_and_derivative(n: usize, x: f64) -> (f64, f64) {
    if n == 0 {
        return (1.0, 0.0);
    }

    let mut p_prev = 1.0;
    let mut p_curr = x;
    for k in 1..n {
        let p_next = ((2 * k + 1) as f64 * x * p_curr - k as f64 * p_prev) / (k + 1) as f64;
        p_prev = p_curr;
        p_curr = p_next;
    }

    let endpoint = (n * (n + 1)) as f64 / 2.0;
    let dp = if (x - 1.0).abs() < 1e-14 {
        endpoint
    } else if (x + 1.0).abs() < 1e-14 {
        if n % 2 == 0 { -endpoint } else { endpoint }
    } else {
        n as f64 * (x * p_curr - p_prev) / (x * x - 1.0)
    };

    (p_curr, dp)
}
