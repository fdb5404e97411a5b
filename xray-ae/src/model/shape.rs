use crate::common::*;

/// The `[channels, height, width]` shape of a single image feature map.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Chw {
    pub c: usize,
    pub h: usize,
    pub w: usize,
}

impl Chw {
    pub fn new(c: usize, h: usize, w: usize) -> Self {
        Self { c, h, w }
    }

    pub fn hw(&self) -> [usize; 2] {
        [self.h, self.w]
    }

    pub fn to_batch_shape(&self, batch_size: usize) -> [i64; 4] {
        [batch_size as i64, self.c as i64, self.h as i64, self.w as i64]
    }
}

impl fmt::Display for Chw {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[{}, {}, {}]", self.c, self.h, self.w)
    }
}

/// Output length of a convolution along one spatial dimension.
pub fn conv_output_len(input: usize, k: usize, s: usize, p: usize) -> Result<usize> {
    ensure!(s > 0, "stride must be positive");
    let padded = input + 2 * p;
    ensure!(
        padded >= k,
        "kernel size {} exceeds padded input length {}",
        k,
        padded
    );
    Ok((padded - k) / s + 1)
}

/// Output length of a transposed convolution along one spatial dimension.
pub fn deconv_output_len(input: usize, k: usize, s: usize, p: usize, op: usize) -> Result<usize> {
    ensure!(input > 0, "input length must be positive");
    let full = (input - 1) * s + k + op;
    ensure!(
        full > 2 * p,
        "transposed convolution output collapses to zero (input {}, kernel {}, stride {}, padding {})",
        input,
        k,
        s,
        p
    );
    Ok(full - 2 * p)
}

/// Output length of a 2x2 max pooling with stride 2.
pub fn pool_output_len(input: usize) -> Result<usize> {
    let output = input / 2;
    ensure!(
        output > 0,
        "max pooling collapses length {} to zero",
        input
    );
    Ok(output)
}
