pub use anyhow::{bail, ensure, format_err, Context as _, Error, Result};
pub use futures::{
    future,
    future::FutureExt as _,
    stream::{self, Stream, StreamExt as _, TryStreamExt as _},
};
pub use indexmap::IndexMap;
pub use itertools::{izip, Itertools as _};
pub use noisy_float::prelude::*;
pub use once_cell::sync::Lazy;
pub use par_stream::prelude::*;
pub use rand::{prelude::*, rngs::StdRng};
pub use serde::{Deserialize, Serialize};
pub use std::{
    borrow::{Borrow, Cow},
    cmp::Ordering,
    collections::{BTreeMap, HashMap, HashSet},
    f64::consts::PI,
    fmt::{self, Debug},
    iter,
    num::NonZeroUsize,
    path::{Path, PathBuf},
    pin::Pin,
    sync::Arc,
};
pub use tch::{
    kind::FLOAT_CPU,
    nn::{self, ModuleT as _},
    vision, Device, IndexOp as _, Kind, Reduction, Tensor,
};
pub use tch_act::{Activation, TensorActivationExt as _};
pub use tch_tensor_like::TensorLike;
pub use tracing::{debug, info, warn};

pub type Fallible<T> = Result<T, Error>;

