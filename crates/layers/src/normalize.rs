// Copyright 2025 Irreducible Inc.

//! L2 normalization with a learned scale.
//!
//! Each sample (or each spatial position of a sample) of the bottom blob is divided by its L2
//! norm and multiplied by a learned scale, which is either one scalar shared by all channels or
//! one value per channel:
//!
//! $$
//! y_{c,p} = s_c \frac{x_{c,p}}{\lVert x \rVert}, \qquad
//! \lVert x \rVert = \sqrt{\epsilon + \sum x^2}
//! $$
//!
//! where the sum runs over the whole `(channels, height, width)` volume in
//! [`NormMode::AcrossSpatial`] and over the channel axis at position `p` in
//! [`NormMode::PerSpatialLocation`].

use brew_hal::{ComputeBackend, CpuBackend};
use brew_tensor::{Blob, Real, Shape};
use brew_utils::{bail, ensure};
use getset::CopyGetters;
use itertools::izip;
use rand::{rngs::StdRng, SeedableRng};
use tracing::{debug, info, instrument};

use crate::{
	filler::{get_filler_with_rng, FillerParameter},
	layer::{check_propagate_down, check_rank},
	Error, Layer,
};

/// Which axes a norm is taken over.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NormMode {
	/// One norm per sample, over all of `(channels, height, width)`.
	AcrossSpatial,
	/// One norm per `(sample, height, width)` position, over the channel axis.
	PerSpatialLocation,
}

/// Configuration of a [`NormalizeLayer`].
#[derive(Debug, Clone, PartialEq)]
pub struct NormalizeParameter {
	pub across_spatial: bool,
	/// Use a single scale for all channels instead of one per channel.
	pub channel_shared: bool,
	/// Added to the sum of squares before the square root.
	pub eps: f64,
	/// Initialises the scale when the layer creates it. Defaults to the constant 1.
	pub scale_filler: Option<FillerParameter>,
}

impl Default for NormalizeParameter {
	fn default() -> Self {
		Self {
			across_spatial: true,
			channel_shared: true,
			eps: 1e-10,
			scale_filler: None,
		}
	}
}

/// Scratch space for one sample. Sized by [`Layer::reshape`]; contents are meaningless between
/// calls.
#[derive(Debug, Default)]
struct Workspace<T> {
	/// `(channels, height, width)`
	buffer: Vec<T>,
	/// `(channels)`
	buffer_channel: Vec<T>,
	/// `(height, width)`
	buffer_spatial: Vec<T>,
	/// `(channels, height, width)`, the top gradient multiplied by the scale
	scaled_diff: Vec<T>,
}

impl<T: Real> Workspace<T> {
	fn resize(&mut self, channels: usize, spatial_dim: usize) {
		self.buffer.resize(channels * spatial_dim, T::zero());
		self.scaled_diff.resize(channels * spatial_dim, T::zero());
		self.buffer_channel.resize(channels, T::zero());
		self.buffer_spatial.resize(spatial_dim, T::zero());
	}
}

/// Per-sample extents of a `(num, channels, height, width)` blob.
#[derive(Debug, Clone, Copy)]
struct Dims {
	num: usize,
	channels: usize,
	spatial_dim: usize,
}

impl Dims {
	fn of(shape: &Shape) -> Self {
		Self {
			num: shape.num(),
			channels: shape.channels(),
			spatial_dim: shape.spatial_dim(),
		}
	}

	fn sample_dim(&self) -> usize {
		self.channels * self.spatial_dim
	}

	/// Number of norms per sample.
	fn norm_dim(&self, mode: NormMode) -> usize {
		match mode {
			NormMode::AcrossSpatial => 1,
			NormMode::PerSpatialLocation => self.spatial_dim,
		}
	}
}

/// Checks that `dims` (taken from one of the blobs) and the `other` blob still match what the
/// last reshape sized the norm cache and the workspace for.
fn check_reshaped<T: Real>(
	mode: NormMode,
	dims: Dims,
	norm: &Blob<T>,
	workspace: &Workspace<T>,
	other: &Blob<T>,
) -> Result<(), Error> {
	let dim = dims.sample_dim();
	ensure!(
		norm.count() == dims.num * dims.norm_dim(mode)
			&& workspace.buffer.len() == dim
			&& workspace.buffer_channel.len() == dims.channels
			&& workspace.buffer_spatial.len() == dims.spatial_dim
			&& other.count() == dims.num * dim,
		Error::NotReshaped("Normalize")
	);
	Ok(())
}

/// Normalizes samples or spatial positions to unit L2 norm, then applies a learned scale.
///
/// The scale is the layer's only learnable parameter. It is created by [`Layer::layer_setup`]
/// unless one was installed beforehand with [`NormalizeLayer::with_scale`], and it is never
/// recreated by a reshape.
#[derive(Debug, CopyGetters)]
pub struct NormalizeLayer<T: Real, B: ComputeBackend = CpuBackend> {
	#[getset(get_copy = "pub")]
	mode: NormMode,
	#[getset(get_copy = "pub")]
	channel_shared: bool,
	#[getset(get_copy = "pub")]
	eps: T,
	scale_filler: FillerParameter,
	/// Drives a random `scale_filler`. Seeded from the OS unless set with
	/// [`NormalizeLayer::with_rng`].
	rng: Option<StdRng>,
	/// Shape `()` when channel-shared, `(channels)` otherwise.
	scale: Option<Blob<T>>,
	scale_propagate_down: bool,
	/// `(num, 1, 1, 1)` or `(num, 1, height, width)` depending on the mode.
	norm: Blob<T>,
	workspace: Workspace<T>,
	backend: B,
	/// Raw `eps` from the parameter, validated at setup.
	eps_param: f64,
}

impl<T: Real> NormalizeLayer<T> {
	pub fn new(param: NormalizeParameter) -> Self {
		Self::with_backend(param, CpuBackend)
	}
}

impl<T: Real, B: ComputeBackend> NormalizeLayer<T, B> {
	pub fn with_backend(param: NormalizeParameter, backend: B) -> Self {
		let mode = if param.across_spatial {
			NormMode::AcrossSpatial
		} else {
			NormMode::PerSpatialLocation
		};
		Self {
			mode,
			channel_shared: param.channel_shared,
			eps: T::from_f64_lossy(param.eps),
			scale_filler: param
				.scale_filler
				.unwrap_or(FillerParameter::Constant { value: 1.0 }),
			rng: None,
			scale: None,
			scale_propagate_down: true,
			norm: Blob::new(Shape::scalar()),
			workspace: Workspace::default(),
			backend,
			eps_param: param.eps,
		}
	}

	/// Installs a scale, e.g. one loaded from a trained model. Setup then keeps it as is, after
	/// checking that its size matches the configuration.
	pub fn with_scale(mut self, scale: Blob<T>) -> Self {
		self.scale = Some(scale);
		self
	}

	/// Sets the rng the scale filler draws from, making a random initialisation reproducible.
	pub fn with_rng(mut self, rng: StdRng) -> Self {
		self.rng = Some(rng);
		self
	}

	pub fn across_spatial(&self) -> bool {
		self.mode == NormMode::AcrossSpatial
	}

	/// The learned scale, once created or installed.
	pub fn scale(&self) -> Option<&Blob<T>> {
		self.scale.as_ref()
	}

	pub fn scale_mut(&mut self) -> Option<&mut Blob<T>> {
		self.scale.as_mut()
	}

	/// Norms computed by the most recent forward pass.
	pub fn norm(&self) -> &Blob<T> {
		&self.norm
	}

	fn expected_scale_count(&self, channels: usize) -> usize {
		if self.channel_shared {
			1
		} else {
			channels
		}
	}
}

/// Multiplies one sample by the scale: `scale[0]` everywhere when channel-shared, otherwise
/// `scale[c]` across every position of channel `c`.
fn apply_scale<T: Real, B: ComputeBackend>(
	backend: &B,
	channel_shared: bool,
	scale: &[T],
	spatial_dim: usize,
	y: &mut [T],
) -> Result<(), Error> {
	if channel_shared {
		backend.scal(scale[0], y)?;
	} else {
		backend.mul_broadcast_channels(scale, spatial_dim, y)?;
	}
	Ok(())
}

impl<T: Real, B: ComputeBackend> Layer<T> for NormalizeLayer<T, B> {
	fn type_name(&self) -> &'static str {
		"Normalize"
	}

	fn exact_num_bottom_blobs(&self) -> Option<usize> {
		Some(1)
	}

	fn exact_num_top_blobs(&self) -> Option<usize> {
		Some(1)
	}

	fn layer_setup(&mut self, bottom: &[&Blob<T>], _top: &mut [&mut Blob<T>]) -> Result<(), Error> {
		check_rank(bottom[0], 2)?;
		ensure!(self.eps_param >= 0.0, Error::InvalidEpsilon(self.eps_param));

		let channels = bottom[0].channels();
		let expected = self.expected_scale_count(channels);
		match &self.scale {
			Some(_) => info!("Skipping parameter initialization"),
			None => {
				let shape = if self.channel_shared {
					Shape::scalar()
				} else {
					Shape::new([channels])
				};
				let mut scale = Blob::new(shape);
				let rng = self.rng.take().unwrap_or_else(StdRng::from_entropy);
				get_filler_with_rng::<T>(&self.scale_filler, rng)?
					.fill(scale.data_mut())?;
				self.scale = Some(scale);
			}
		}

		let actual = self.scale.as_ref().map_or(0, Blob::count);
		ensure!(actual == expected, Error::ScaleSizeMismatch { expected, actual });
		Ok(())
	}

	fn reshape(&mut self, bottom: &[&Blob<T>], top: &mut [&mut Blob<T>]) -> Result<(), Error> {
		let bottom = bottom[0];
		check_rank(bottom, 2)?;
		top[0].reshape_like(bottom);

		let Dims {
			num,
			channels,
			spatial_dim,
		} = Dims::of(bottom.shape());
		self.workspace.resize(channels, spatial_dim);
		match self.mode {
			NormMode::AcrossSpatial => self.norm.reshape([num, 1, 1, 1]),
			NormMode::PerSpatialLocation => {
				self.norm
					.reshape([num, 1, bottom.height(), bottom.width()])
			}
		}
		debug!(shape = %bottom.shape(), mode = ?self.mode, "normalize reshape");
		Ok(())
	}

	#[instrument(skip_all, name = "NormalizeLayer::forward", level = "debug")]
	fn forward(&mut self, bottom: &[&Blob<T>], top: &mut [&mut Blob<T>]) -> Result<(), Error> {
		let Self {
			mode,
			channel_shared,
			eps,
			scale,
			norm,
			workspace,
			backend,
			..
		} = self;
		let Some(scale) = scale.as_ref().map(Blob::data) else {
			bail!(Error::NotSetUp("Normalize"));
		};
		let bottom = bottom[0];
		let top = &mut *top[0];

		let dims = Dims::of(bottom.shape());
		check_reshaped(*mode, dims, norm, workspace, top)?;
		let dim = dims.sample_dim();
		if dims.num == 0 || dim == 0 {
			return Ok(());
		}
		let norm_dim = dims.norm_dim(*mode);

		let Workspace { buffer, .. } = workspace;
		for (bottom_data, top_data, norm_data) in izip!(
			bottom.data().chunks_exact(dim),
			top.data_mut().chunks_exact_mut(dim),
			norm.data_mut().chunks_exact_mut(norm_dim)
		) {
			backend.sqr(bottom_data, buffer)?;
			match *mode {
				NormMode::AcrossSpatial => {
					let sample_norm = (backend.asum(buffer)? + *eps).sqrt();
					norm_data[0] = sample_norm;
					backend.scale(T::one() / sample_norm, bottom_data, top_data)?;
				}
				NormMode::PerSpatialLocation => {
					norm_data.fill(*eps);
					backend.add_channel_sums(buffer, dims.spatial_dim, norm_data)?;
					backend.powx_assign(T::from_f64_lossy(0.5), norm_data)?;
					backend.scale(T::one(), bottom_data, top_data)?;
					backend.div_broadcast_spatial(norm_data, top_data)?;
				}
			}
			apply_scale(backend, *channel_shared, scale, dims.spatial_dim, top_data)?;
		}
		Ok(())
	}

	#[instrument(skip_all, name = "NormalizeLayer::backward", level = "debug")]
	fn backward(
		&mut self,
		top: &[&Blob<T>],
		propagate_down: &[bool],
		bottom: &mut [&mut Blob<T>],
	) -> Result<(), Error> {
		check_propagate_down(propagate_down, bottom.len())?;
		let Self {
			mode,
			channel_shared,
			scale,
			scale_propagate_down,
			norm,
			workspace,
			backend,
			..
		} = self;
		let Some(scale) = scale else {
			bail!(Error::NotSetUp("Normalize"));
		};
		let top = top[0];
		let bottom = &mut *bottom[0];

		let dims = Dims::of(top.shape());
		check_reshaped(*mode, dims, norm, workspace, bottom)?;
		let dim = dims.sample_dim();
		if dims.num == 0 || dim == 0 {
			return Ok(());
		}
		let norm_dim = dims.norm_dim(*mode);
		let Workspace {
			buffer,
			buffer_channel,
			buffer_spatial,
			scaled_diff,
		} = workspace;

		// The top values already carry the scale, so dL/ds = sum(y * dy) / s.
		if *scale_propagate_down {
			let (scale_data, scale_diff) = scale.data_and_diff_mut();
			if let Some(index) = scale_data.iter().position(|s| *s == T::zero()) {
				bail!(Error::ZeroScale { index });
			}
			if *channel_shared {
				let a = backend.dot(top.data(), top.diff())?;
				scale_diff[0] = scale_diff[0] + a / scale_data[0];
			} else {
				for (top_data, top_diff) in
					izip!(top.data().chunks_exact(dim), top.diff().chunks_exact(dim))
				{
					backend.mul(top_data, top_diff, buffer)?;
					buffer_channel.fill(T::zero());
					backend.add_spatial_sums(buffer, dims.spatial_dim, buffer_channel)?;
					backend.div_assign(scale_data, buffer_channel)?;
					backend.add_assign(buffer_channel, scale_diff)?;
				}
			}
		}

		if !propagate_down[0] {
			return Ok(());
		}

		let scale_data = scale.data();
		let one = T::one();
		let (bottom_data, bottom_diff) = bottom.data_and_diff_mut();
		for (bottom_data, top_diff, bottom_diff, norm_data) in izip!(
			bottom_data.chunks_exact(dim),
			top.diff().chunks_exact(dim),
			bottom_diff.chunks_exact_mut(dim),
			norm.data().chunks_exact(norm_dim)
		) {
			// g = s * dy, then buffer <- (g - x * <x, g> / |x|^2) / |x|, per sample or per
			// position
			backend.scale(one, top_diff, scaled_diff)?;
			apply_scale(backend, *channel_shared, scale_data, dims.spatial_dim, scaled_diff)?;
			match *mode {
				NormMode::AcrossSpatial => {
					let sample_norm = norm_data[0];
					let a = backend.dot(bottom_data, scaled_diff)?;
					backend.scale(a / sample_norm / sample_norm, bottom_data, buffer)?;
					backend.axpby(one, scaled_diff, -one, buffer)?;
					backend.scal(one / sample_norm, buffer)?;
				}
				NormMode::PerSpatialLocation => {
					backend.mul(bottom_data, scaled_diff, buffer)?;
					buffer_spatial.fill(T::zero());
					backend.add_channel_sums(buffer, dims.spatial_dim, buffer_spatial)?;
					backend.scale(one, bottom_data, buffer)?;
					backend.mul_broadcast_spatial(buffer_spatial, buffer)?;
					backend.powx(norm_data, T::from_f64_lossy(2.0), buffer_spatial)?;
					backend.div_broadcast_spatial(buffer_spatial, buffer)?;
					backend.axpby(one, scaled_diff, -one, buffer)?;
					backend.div_broadcast_spatial(norm_data, buffer)?;
				}
			}
			backend.add_assign(buffer, bottom_diff)?;
		}
		Ok(())
	}

	fn learnable_params(&self) -> Vec<&Blob<T>> {
		self.scale.iter().collect()
	}

	fn learnable_params_mut(&mut self) -> Vec<&mut Blob<T>> {
		self.scale.iter_mut().collect()
	}

	fn param_propagate_down(&self, param_id: usize) -> bool {
		param_id == 0 && self.scale_propagate_down
	}

	fn set_param_propagate_down(&mut self, param_id: usize, value: bool) {
		if param_id == 0 {
			self.scale_propagate_down = value;
		}
	}
}
