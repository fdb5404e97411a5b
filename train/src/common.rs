//! Common imports from external crates.

pub use anyhow::{bail, ensure, format_err, Context, Error, Result};
pub use chrono::{DateTime, Local};
pub use futures::{
    future,
    future::FutureExt,
    stream::{self, Stream, StreamExt, TryStreamExt},
};
pub use indexmap::IndexMap;
pub use itertools::{izip, Itertools};
pub use noisy_float::prelude::*;
pub use once_cell::sync::Lazy;
pub use rand::{prelude::*, rngs::StdRng};
pub use regex::Regex;
pub use serde::{Deserialize, Serialize};
pub use std::{
    borrow::{Borrow, Cow},
    collections::HashMap,
    fmt::Debug,
    future::Future,
    io::{self, BufRead, Write},
    num::NonZeroUsize,
    path::{Path, PathBuf},
    pin::Pin,
    sync::Arc,
    time::{Duration, Instant},
};
pub use tch::{
    kind::FLOAT_CPU,
    nn::{self, ModuleT as _, OptimizerConfig as _},
    Device, IndexOp, Kind, Reduction, Tensor,
};
pub use tch_tensor_like::TensorLike;
pub use tfrecord::{EventWriter, EventWriterInit};
pub use tokio::sync::broadcast;
pub use tracing::{debug, info, warn};
pub use xray_ae::{
    dataset::{Batch, DatasetSplit, FileRecord, MuraDataset, TrainValTestSplitter},
    loss::{BceWithLogitsLoss, ReconstructionLoss},
    metrics::{EvaluationMetrics, ScoreAccumulator},
    model::{Chw, ModelInit, ModelSummary},
    processor::PreprocessorInit,
};

pub type Fallible<T> = Result<T, Error>;
