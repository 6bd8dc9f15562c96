//! The fit context: a catalog bound to a set of images.
//!
//! [`Tractor`] composes per-source patches into model images, assembles
//! derivative patches into weighted normal equations and runs damped
//! Gauss-Newton (Levenberg-Marquardt) steps with a short line search.
//!
//! Parameter vector layout: every image's thawed parameters in image order,
//! then the catalog's, source by source.


use std::sync::Arc;

use common::Buffer2;
use nalgebra::{DMatrix, DVector};
use rayon::prelude::*;

use crate::catalog::Catalog;
use crate::config::{OptimizerConfig, RenderConfig};
use crate::error::{Error, Result};
use crate::image::Image;
use crate::params::Params;
use crate::patch::ModelPatch;
use crate::profiles::SersicProfileTable;
use crate::render::RenderContext;

/// Relative singular-value cutoff for the normal-equation solve.
const SVD_RCOND: f64 = 1e-12;

/// Derivative patches indexed `[parameter][image]`.
pub type Derivatives = Vec<Vec<Option<ModelPatch>>>;

/// Outcome of one damped step.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct StepResult {
    /// Log-likelihood gain, zero when the step was rejected.
    pub dlnp: f64,
    /// Line-search multiplier that was kept; `None` when no multiplier
    /// improved the fit and the parameters were restored.
    pub fraction: Option<f64>,
}

impl StepResult {
    pub fn accepted(&self) -> bool {
        self.fraction.is_some()
    }
}

/// Outcome of [`Tractor::optimize_loop`].
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct FitResult {
    /// The last accepted step gained less than the threshold.
    pub converged: bool,
    /// Linearizations performed.
    pub iterations: usize,
    pub log_likelihood: f64,
    /// Gain of the last accepted step.
    pub last_dlnp: f64,
}

/// Linearization of the model at one parameter vector.
struct NormalEquations {
    params: Vec<f64>,
    log_likelihood: f64,
    jtj: DMatrix<f64>,
    jtr: DVector<f64>,
}

impl NormalEquations {
    /// Gain of the undamped Gauss-Newton step under the quadratic model,
    /// `d.Jtr - d.JtJ.d / 2`.
    fn predicted_gain(&self) -> f64 {
        match solve_damped(&self.jtj, &self.jtr, 0.0) {
            Some(delta) => delta.dot(&self.jtr) - 0.5 * delta.dot(&(&self.jtj * &delta)),
            None if self.jtr.iter().all(|g| *g == 0.0) => 0.0,
            None => f64::INFINITY,
        }
    }
}

#[derive(Debug, Clone)]
pub struct Tractor {
    images: Vec<Image>,
    catalog: Catalog,
    profiles: Arc<SersicProfileTable>,
    config: RenderConfig,
}

impl Tractor {
    /// Fit context using the process-wide Sersic table and default render
    /// settings.
    pub fn new(images: Vec<Image>, catalog: Catalog) -> Self {
        Self {
            images,
            catalog,
            profiles: SersicProfileTable::shared(),
            config: RenderConfig::default(),
        }
    }

    pub fn with_profiles(mut self, profiles: Arc<SersicProfileTable>) -> Self {
        self.profiles = profiles;
        self
    }

    pub fn with_render_config(mut self, config: RenderConfig) -> Result<Self> {
        config.validate()?;
        self.config = config;
        Ok(self)
    }

    pub fn images(&self) -> &[Image] {
        &self.images
    }

    pub fn image(&self, i: usize) -> &Image {
        &self.images[i]
    }

    pub fn image_mut(&mut self, i: usize) -> &mut Image {
        &mut self.images[i]
    }

    pub fn catalog(&self) -> &Catalog {
        &self.catalog
    }

    pub fn catalog_mut(&mut self) -> &mut Catalog {
        &mut self.catalog
    }

    pub fn render_config(&self) -> &RenderConfig {
        &self.config
    }

    pub fn profiles(&self) -> &SersicProfileTable {
        &self.profiles
    }

    pub fn context(&self, i: usize) -> RenderContext<'_> {
        RenderContext::new(&self.images[i], &self.config, &self.profiles)
    }

    // ------------------------------------------------------------------------
    // Parameters
    // ------------------------------------------------------------------------

    /// Freeze a parameter group (e.g. `"sky"`) on every image.
    pub fn freeze_images(&mut self, group: &str) -> usize {
        self.images.iter_mut().map(|im| im.freeze(group)).sum()
    }

    pub fn thaw_images(&mut self, group: &str) -> usize {
        self.images.iter_mut().map(|im| im.thaw(group)).sum()
    }

    pub fn num_params(&self) -> usize {
        self.images.iter().map(Params::num_params).sum::<usize>() + self.catalog.num_params()
    }

    pub fn param_names(&self) -> Vec<String> {
        let mut names: Vec<String> = self
            .images
            .iter()
            .enumerate()
            .flat_map(|(i, im)| {
                im.param_names()
                    .into_iter()
                    .map(move |name| format!("image{i}.{name}"))
            })
            .collect();
        names.extend(self.catalog.param_names());
        names
    }

    pub fn get_params(&self) -> Vec<f64> {
        let mut values: Vec<f64> = self.images.iter().flat_map(|im| im.get_params()).collect();
        values.extend(self.catalog.get_params());
        values
    }

    /// # Panics
    /// If `values.len() != self.num_params()`.
    pub fn set_params(&mut self, values: &[f64]) {
        assert_eq!(
            values.len(),
            self.num_params(),
            "expected {} parameter values, got {}",
            self.num_params(),
            values.len()
        );
        let mut rest = values;
        for image in &mut self.images {
            let (head, tail) = rest.split_at(image.num_params());
            image.set_params(head);
            rest = tail;
        }
        self.catalog.set_params(rest);
    }

    // ------------------------------------------------------------------------
    // Model evaluation
    // ------------------------------------------------------------------------

    /// Sky plus every source's patch, in counts.
    pub fn get_model_image(&self, i: usize) -> Buffer2<f64> {
        let image = &self.images[i];
        let ctx = self.context(i);
        let mut model = Buffer2::new_default(image.width(), image.height());
        image.sky().add_to(&mut model);

        let patches: Vec<ModelPatch> = self
            .catalog
            .sources()
            .par_iter()
            .filter_map(|source| source.model_patch(&ctx))
            .collect();
        for patch in &patches {
            patch.add_to(&mut model);
        }
        model
    }

    /// `(data - model) * sqrt(invvar)`.
    pub fn get_chi_image(&self, i: usize) -> Buffer2<f64> {
        let image = &self.images[i];
        let model = self.get_model_image(i);
        Buffer2::from_fn(image.width(), image.height(), |x, y| {
            (image.data()[(x, y)] - model[(x, y)]) * image.invvar()[(x, y)].sqrt()
        })
    }

    /// `-chi^2 / 2` summed over all images.
    pub fn get_log_likelihood(&self) -> f64 {
        let chi2: f64 = (0..self.images.len())
            .into_par_iter()
            .map(|i| self.get_chi_image(i).iter().map(|c| c * c).sum::<f64>())
            .sum();
        -0.5 * chi2
    }

    /// Derivative patches for every thawed parameter on every image.
    pub fn get_derivatives(&self) -> Derivatives {
        let n_images = self.images.len();
        let mut derivs: Derivatives = Vec::with_capacity(self.num_params());

        for (i, image) in self.images.iter().enumerate() {
            for _ in image.slots().thawed() {
                let mut row = vec![None; n_images];
                row[i] = Some(image.sky().derivative(image.width(), image.height()));
                derivs.push(row);
            }
        }

        let contexts: Vec<RenderContext<'_>> = (0..n_images).map(|i| self.context(i)).collect();
        let per_source: Vec<Derivatives> = self
            .catalog
            .sources()
            .par_iter()
            .map(|source| {
                let per_image: Derivatives = contexts
                    .iter()
                    .map(|ctx| source.param_derivatives(ctx))
                    .collect();
                transpose(per_image, source.num_params())
            })
            .collect();
        derivs.extend(per_source.into_iter().flatten());
        derivs
    }

    // ------------------------------------------------------------------------
    // Optimization
    // ------------------------------------------------------------------------

    /// One damped step with line search over `step_fractions` (ascending).
    ///
    /// On success the parameters are left at the best point found; a
    /// rejected step restores them.
    pub fn optimize(&mut self, damping: f64, step_fractions: &[f64]) -> Result<StepResult> {
        if self.num_params() == 0 {
            return Err(Error::NoParameters);
        }
        let equations = self.linearize();
        Ok(self.try_step(&equations, damping, step_fractions))
    }

    /// Repeat [`optimize`](Self::optimize) until an accepted step gains less
    /// than `dlnp_threshold`, the iteration budget runs out, or the damping
    /// needed to make progress exceeds `max_damping`.
    ///
    /// A linearization whose undamped step promises no more than
    /// `dlnp_threshold` counts as converged without searching.
    pub fn optimize_loop(&mut self, config: &OptimizerConfig) -> Result<FitResult> {
        config.validate()?;
        if self.num_params() == 0 {
            return Err(Error::NoParameters);
        }

        let mut damping = config.damping;
        let mut converged = false;
        let mut last_dlnp = 0.0;
        let mut iterations = 0;

        'outer: while iterations < config.max_iterations {
            iterations += 1;
            let equations = self.linearize();
            let predicted = equations.predicted_gain();
            if predicted <= config.dlnp_threshold {
                tracing::debug!(iteration = iterations, predicted, "at optimum");
                converged = true;
                break;
            }
            loop {
                let step = self.try_step(&equations, damping, &config.step_fractions);
                if step.accepted() {
                    damping *= config.lambda_down;
                    last_dlnp = step.dlnp;
                    tracing::debug!(iteration = iterations, dlnp = step.dlnp, damping, "step accepted");
                    if step.dlnp < config.dlnp_threshold {
                        converged = true;
                        break 'outer;
                    }
                    break;
                }
                damping *= config.lambda_up;
                tracing::debug!(iteration = iterations, damping, "step rejected");
                if damping > config.max_damping {
                    break 'outer;
                }
            }
        }

        let result = FitResult {
            converged,
            iterations,
            log_likelihood: self.get_log_likelihood(),
            last_dlnp,
        };
        tracing::info!(
            converged = result.converged,
            iterations = result.iterations,
            lnp = result.log_likelihood,
            "fit finished"
        );
        Ok(result)
    }

    fn linearize(&self) -> NormalEquations {
        let derivs = self.get_derivatives();
        let residuals: Vec<Buffer2<f64>> = (0..self.images.len())
            .into_par_iter()
            .map(|i| {
                let model = self.get_model_image(i);
                let data = self.images[i].data();
                Buffer2::from_fn(model.width(), model.height(), |x, y| {
                    data[(x, y)] - model[(x, y)]
                })
            })
            .collect();
        let log_likelihood = -0.5
            * residuals
                .iter()
                .zip(&self.images)
                .map(|(r, im)| r.iter().zip(im.invvar().iter()).map(|(r, w)| r * r * w).sum::<f64>())
                .sum::<f64>();

        let n = derivs.len();
        let rows: Vec<(Vec<f64>, f64)> = (0..n)
            .into_par_iter()
            .map(|a| {
                let row = (a..n)
                    .map(|b| {
                        self.images
                            .iter()
                            .enumerate()
                            .map(|(i, im)| match (&derivs[a][i], &derivs[b][i]) {
                                (Some(da), Some(db)) => da.weighted_dot(db, im.invvar()),
                                _ => 0.0,
                            })
                            .sum()
                    })
                    .collect();
                let gradient = self
                    .images
                    .iter()
                    .enumerate()
                    .filter_map(|(i, im)| {
                        derivs[a][i]
                            .as_ref()
                            .map(|d| d.weighted_dot_image(&residuals[i], im.invvar()))
                    })
                    .sum();
                (row, gradient)
            })
            .collect();

        let mut jtj = DMatrix::zeros(n, n);
        let mut jtr = DVector::zeros(n);
        for (a, (row, gradient)) in rows.into_iter().enumerate() {
            jtr[a] = gradient;
            for (offset, v) in row.into_iter().enumerate() {
                jtj[(a, a + offset)] = v;
                jtj[(a + offset, a)] = v;
            }
        }

        NormalEquations {
            params: self.get_params(),
            log_likelihood,
            jtj,
            jtr,
        }
    }

    fn try_step(
        &mut self,
        equations: &NormalEquations,
        damping: f64,
        step_fractions: &[f64],
    ) -> StepResult {
        let rejected = StepResult {
            dlnp: 0.0,
            fraction: None,
        };
        let Some(delta) = solve_damped(&equations.jtj, &equations.jtr, damping) else {
            tracing::warn!(damping, "normal equations are singular");
            return rejected;
        };

        let lnp0 = equations.log_likelihood;
        let mut best: Option<(f64, f64)> = None;
        let mut previous = lnp0;
        for &fraction in step_fractions {
            self.apply_step(&equations.params, &delta, fraction);
            let lnp = self.get_log_likelihood();
            tracing::debug!(fraction, dlnp = lnp - lnp0, "line search");
            if lnp > best.map_or(lnp0, |(l, _)| l) {
                best = Some((lnp, fraction));
            }
            if !(lnp >= previous) {
                break;
            }
            previous = lnp;
        }

        match best {
            Some((lnp, fraction)) => {
                self.apply_step(&equations.params, &delta, fraction);
                StepResult {
                    dlnp: lnp - lnp0,
                    fraction: Some(fraction),
                }
            }
            None => {
                self.set_params(&equations.params);
                rejected
            }
        }
    }

    fn apply_step(&mut self, origin: &[f64], delta: &DVector<f64>, fraction: f64) {
        let values: Vec<f64> = origin
            .iter()
            .zip(delta.iter())
            .map(|(p, d)| p + fraction * d)
            .collect();
        self.set_params(&values);
        self.images.iter_mut().for_each(Params::constrain);
        self.catalog.constrain();
        self.catalog.clamp_to_table(&self.profiles);
    }
}

/// `[image][param]` to `[param][image]`.
fn transpose(per_image: Derivatives, n_params: usize) -> Derivatives {
    let mut out: Derivatives = (0..n_params)
        .map(|_| Vec::with_capacity(per_image.len()))
        .collect();
    for derivs in per_image {
        for (k, d) in derivs.into_iter().enumerate() {
            out[k].push(d);
        }
    }
    out
}

/// Solve `(JtJ + damping * diag(JtJ)) x = Jtr` by SVD, dropping singular
/// directions (parameters with no information on any image).
fn solve_damped(jtj: &DMatrix<f64>, jtr: &DVector<f64>, damping: f64) -> Option<DVector<f64>> {
    let mut a = jtj.clone();
    for i in 0..a.nrows() {
        a[(i, i)] *= 1.0 + damping;
    }
    let svd = a.svd(true, true);
    let eps = SVD_RCOND * svd.singular_values.max();
    if !(eps > 0.0) {
        return None;
    }
    let x = svd.solve(jtr, eps).ok()?;
    x.iter().all(|v| v.is_finite()).then_some(x)
}
