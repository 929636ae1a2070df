// Copyright 2025 Irreducible Inc.

use brew_layers::Layer;
use brew_tensor::{Blob, Real};

/// Compares the gradients computed by [`Layer::backward`] with central finite differences of
/// the forward pass.
///
/// The objective is either half the sum of squares of all top values, or a single top element
/// (weighted by 2). An analytic gradient `g` and an estimate `e` agree when
/// `|g - e| <= threshold * max(|g|, |e|, 1)`.
#[derive(Debug, Clone, Copy)]
pub struct GradientChecker {
	stepsize: f64,
	threshold: f64,
}

/// A blob whose gradient is being checked.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Target {
	Param(usize),
	Bottom(usize),
}

impl Default for GradientChecker {
	fn default() -> Self {
		Self::new(1e-2, 1e-3)
	}
}

impl GradientChecker {
	pub fn new(stepsize: f64, threshold: f64) -> Self {
		Self {
			stepsize,
			threshold,
		}
	}

	/// Checks against the sum-of-squares objective over every top blob.
	///
	/// `check_bottom` restricts the bottom blobs checked to one index; parameters with
	/// [`Layer::param_propagate_down`] set are always checked.
	pub fn check_gradient<T: Real, L: Layer<T>>(
		&self,
		layer: &mut L,
		bottom: &mut [Blob<T>],
		top: &mut [Blob<T>],
		check_bottom: Option<usize>,
	) {
		setup(layer, bottom, top);
		self.check_gradient_single(layer, bottom, top, check_bottom, None);
	}

	/// Checks against every single-element objective in turn.
	pub fn check_gradient_exhaustive<T: Real, L: Layer<T>>(
		&self,
		layer: &mut L,
		bottom: &mut [Blob<T>],
		top: &mut [Blob<T>],
		check_bottom: Option<usize>,
	) {
		setup(layer, bottom, top);
		for top_id in 0..top.len() {
			for top_data_id in 0..top[top_id].count() {
				self.check_gradient_single(
					layer,
					bottom,
					top,
					check_bottom,
					Some((top_id, top_data_id)),
				);
			}
		}
	}

	fn check_gradient_single<T: Real, L: Layer<T>>(
		&self,
		layer: &mut L,
		bottom: &mut [Blob<T>],
		top: &mut [Blob<T>],
		check_bottom: Option<usize>,
		objective: Option<(usize, usize)>,
	) {
		let n_params = layer.learnable_params().len();
		let mut targets = (0..n_params)
			.filter(|&i| layer.param_propagate_down(i))
			.map(Target::Param)
			.collect::<Vec<_>>();
		let propagate_down = (0..bottom.len())
			.map(|i| check_bottom.map_or(true, |checked| checked == i))
			.collect::<Vec<_>>();
		targets.extend(
			propagate_down
				.iter()
				.enumerate()
				.filter(|(_, &down)| down)
				.map(|(i, _)| Target::Bottom(i)),
		);
		assert!(!targets.is_empty(), "no blobs to check");

		// Analytic gradients, starting from zeroed diffs.
		for param in layer.learnable_params_mut() {
			param.set_diff(T::zero());
		}
		for blob in bottom.iter_mut() {
			blob.set_diff(T::zero());
		}
		forward(layer, bottom, top);
		objective_and_gradient(top, objective);
		{
			let top_refs = top.iter().collect::<Vec<_>>();
			let mut bottom_refs = bottom.iter_mut().collect::<Vec<_>>();
			layer
				.backward(&top_refs, &propagate_down, &mut bottom_refs)
				.expect("backward pass");
		}
		let computed = targets
			.iter()
			.map(|&target| match target {
				Target::Param(i) => layer.learnable_params()[i].diff().to_vec(),
				Target::Bottom(i) => bottom[i].diff().to_vec(),
			})
			.collect::<Vec<_>>();

		let step = T::from_f64_lossy(self.stepsize);
		let two = T::from_f64_lossy(2.0);
		for (&target, computed) in targets.iter().zip(&computed) {
			for feat_id in 0..computed.len() {
				let original = target_data(layer, bottom, target)[feat_id];

				target_data(layer, bottom, target)[feat_id] = original + step;
				forward(layer, bottom, top);
				let positive = objective_and_gradient(top, objective);

				target_data(layer, bottom, target)[feat_id] = original - step;
				forward(layer, bottom, top);
				let negative = objective_and_gradient(top, objective);

				target_data(layer, bottom, target)[feat_id] = original;

				let estimated = ((positive - negative) / step / two).to_f64_lossy();
				let computed = computed[feat_id].to_f64_lossy();
				let scale = computed.abs().max(estimated.abs()).max(1.0);
				assert!(
					(computed - estimated).abs() <= self.threshold * scale,
					"{target:?} element {feat_id} (objective {objective:?}): \
					 computed gradient {computed} vs estimated {estimated}"
				);
			}
		}
	}
}

fn setup<T: Real, L: Layer<T>>(layer: &mut L, bottom: &[Blob<T>], top: &mut [Blob<T>]) {
	let bottom_refs = bottom.iter().collect::<Vec<_>>();
	let mut top_refs = top.iter_mut().collect::<Vec<_>>();
	layer
		.setup(&bottom_refs, &mut top_refs)
		.expect("layer setup");
}

fn forward<T: Real, L: Layer<T>>(layer: &mut L, bottom: &[Blob<T>], top: &mut [Blob<T>]) {
	let bottom_refs = bottom.iter().collect::<Vec<_>>();
	let mut top_refs = top.iter_mut().collect::<Vec<_>>();
	layer
		.forward(&bottom_refs, &mut top_refs)
		.expect("forward pass");
}

fn target_data<'a, T: Real, L: Layer<T>>(
	layer: &'a mut L,
	bottom: &'a mut [Blob<T>],
	target: Target,
) -> &'a mut [T] {
	match target {
		Target::Param(i) => layer
			.learnable_params_mut()
			.swap_remove(i)
			.data_mut(),
		Target::Bottom(i) => bottom[i].data_mut(),
	}
}

/// Evaluates the objective on the top values and writes its gradient into the top diffs.
fn objective_and_gradient<T: Real>(top: &mut [Blob<T>], objective: Option<(usize, usize)>) -> T {
	match objective {
		None => {
			let mut loss = T::zero();
			for blob in top.iter_mut() {
				let (data, diff) = blob.data_and_diff_mut();
				for (&x, dx) in data.iter().zip(diff.iter_mut()) {
					loss = loss + x * x;
					*dx = x;
				}
			}
			loss / T::from_f64_lossy(2.0)
		}
		Some((top_id, top_data_id)) => {
			let loss_weight = T::from_f64_lossy(2.0);
			for blob in top.iter_mut() {
				blob.set_diff(T::zero());
			}
			top[top_id].diff_mut()[top_data_id] = loss_weight;
			top[top_id].data()[top_data_id] * loss_weight
		}
	}
}
