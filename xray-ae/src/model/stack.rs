use crate::common::*;

/// Per-layer hyper-parameters of one convolution stack.
///
/// The i-th entries of the four lists describe the i-th layer.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct LayerStack {
    pub in_channels: Vec<usize>,
    pub out_channels: Vec<usize>,
    pub kernel_sizes: Vec<usize>,
    pub strides: Vec<usize>,
}

/// The hyper-parameters of a single layer in a [LayerStack].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct LayerParams {
    pub in_c: usize,
    pub out_c: usize,
    pub k: usize,
    pub s: usize,
}

impl LayerStack {
    pub fn new(
        in_channels: impl Into<Vec<usize>>,
        out_channels: impl Into<Vec<usize>>,
        kernel_sizes: impl Into<Vec<usize>>,
        strides: impl Into<Vec<usize>>,
    ) -> Self {
        Self {
            in_channels: in_channels.into(),
            out_channels: out_channels.into(),
            kernel_sizes: kernel_sizes.into(),
            strides: strides.into(),
        }
    }

    pub fn len(&self) -> usize {
        self.in_channels.len()
    }

    pub fn is_empty(&self) -> bool {
        self.in_channels.is_empty()
    }

    pub fn first_in_channels(&self) -> Option<usize> {
        self.in_channels.first().copied()
    }

    pub fn last_out_channels(&self) -> Option<usize> {
        self.out_channels.last().copied()
    }

    /// Checks that the lists have equal lengths and the channels chain up.
    pub fn validate(&self, name: &str) -> Result<()> {
        let Self {
            in_channels,
            out_channels,
            kernel_sizes,
            strides,
        } = self;

        ensure!(!in_channels.is_empty(), "the {} stack has no layers", name);
        ensure!(
            in_channels.len() == out_channels.len()
                && in_channels.len() == kernel_sizes.len()
                && in_channels.len() == strides.len(),
            "the {} stack has lists of unequal lengths: in_channels {}, out_channels {}, kernel_sizes {}, strides {}",
            name,
            in_channels.len(),
            out_channels.len(),
            kernel_sizes.len(),
            strides.len()
        );
        ensure!(
            in_channels.iter().chain(out_channels).all(|&c| c > 0),
            "the {} stack has zero channels",
            name
        );
        ensure!(
            kernel_sizes.iter().chain(strides).all(|&v| v > 0),
            "the {} stack has zero kernel size or stride",
            name
        );

        for (index, (&out_c, &next_in_c)) in out_channels.iter().zip(&in_channels[1..]).enumerate() {
            ensure!(
                out_c == next_in_c,
                "the {} stack layer {} outputs {} channels, but layer {} expects {}",
                name,
                index,
                out_c,
                index + 1,
                next_in_c
            );
        }

        Ok(())
    }

    pub fn layers(&self) -> impl Iterator<Item = LayerParams> + '_ {
        izip!(
            &self.in_channels,
            &self.out_channels,
            &self.kernel_sizes,
            &self.strides
        )
        .map(|(&in_c, &out_c, &k, &s)| LayerParams { in_c, out_c, k, s })
    }
}
