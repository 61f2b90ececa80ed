mod activation;
mod add;
mod affine;
mod avg_pool2d;
mod batch_norm;
mod concat;
mod conv2d;
mod dropout;
mod embedding;
mod extract;
mod fully_connected;
mod global_avg_pool;
mod mat_mul;
mod max_pool2d;
mod multiply;
mod permute;
mod positional_encoding;
mod reshape;
mod rms_norm;
mod scale_const;
mod tril_mask;
mod upsample;

pub use activation::{Activation, ActivationKind};
pub use add::Add;
pub use affine::Affine;
pub use avg_pool2d::AvgPool2d;
pub use batch_norm::BatchNorm;
pub use concat::Concat;
pub use conv2d::Conv2d;
pub use dropout::Dropout;
pub use embedding::Embedding;
pub use extract::Extract;
pub use fully_connected::FullyConnected;
pub use global_avg_pool::GlobalAvgPool;
pub use mat_mul::MatMul;
pub use max_pool2d::MaxPool2d;
pub use multiply::Multiply;
pub use permute::Permute;
pub use positional_encoding::PositionalEncoding;
pub use reshape::Reshape;
pub use rms_norm::RmsNorm;
pub use scale_const::ScaleConst;
pub use tril_mask::TrilMask;
pub use upsample::Upsample;
