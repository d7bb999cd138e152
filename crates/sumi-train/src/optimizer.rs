use crate::{Error, Grads, ParamsMut, Result};
use std::collections::BTreeMap;

/// Updates parameters in place from a key-aligned gradient collection.
pub trait Optimizer {
    fn update(&mut self, params: &mut ParamsMut<'_>, grads: &Grads) -> Result<()>;

    fn lr(&self) -> f64;

    /// Update the learning rate.
    fn set_lr(&mut self, lr: f64);
}

/// Every gradient must name a parameter, every parameter must have a
/// gradient, and paired values must agree in rank and shape.
pub(crate) fn check_aligned(params: &ParamsMut<'_>, grads: &Grads) -> Result<()> {
    if let Some(name) = grads.keys().find(|k| !params.contains_key(*k)) {
        return Err(Error::UnknownGradient(name.clone()));
    }
    for (name, p) in params {
        let g = grads
            .get(name)
            .ok_or_else(|| Error::MissingGradient(name.clone()))?;
        if p.rank() != g.rank() {
            return Err(Error::RankMismatch {
                name: name.clone(),
                param: p.rank(),
                grad: g.rank(),
            });
        }
        if p.dims() != g.dims() {
            return Err(sumi_la::Error::shape_mismatch("optimizer update", &p.dims(), &g.dims()).into());
        }
    }
    Ok(())
}

/// Per-parameter state, allocated on first sight of a name.
fn state<'a>(slots: &'a mut BTreeMap<String, Vec<f64>>, name: &str, len: usize) -> &'a mut Vec<f64> {
    slots
        .entry(name.to_owned())
        .or_insert_with(|| vec![0.0; len])
}

/// Plain gradient descent: `p -= lr·g`.
#[derive(Debug, Clone)]
pub struct Sgd {
    pub lr: f64,
}

impl Sgd {
    pub fn new(lr: f64) -> Self {
        Self { lr }
    }
}

impl Optimizer for Sgd {
    fn update(&mut self, params: &mut ParamsMut<'_>, grads: &Grads) -> Result<()> {
        check_aligned(params, grads)?;
        for (name, p) in params.iter_mut() {
            let g = grads[name].as_slice();
            for (w, &gi) in p.as_mut_slice().iter_mut().zip(g) {
                *w -= self.lr * gi;
            }
        }
        Ok(())
    }

    fn lr(&self) -> f64 {
        self.lr
    }

    fn set_lr(&mut self, lr: f64) {
        self.lr = lr;
    }
}

/// Velocity-based descent: `v = m·v − lr·g; p += v`.
#[derive(Debug, Clone)]
pub struct Momentum {
    pub lr: f64,
    pub momentum: f64,
    velocity: BTreeMap<String, Vec<f64>>,
}

impl Momentum {
    pub fn new(lr: f64) -> Self {
        Self::with_momentum(lr, 0.9)
    }

    pub fn with_momentum(lr: f64, momentum: f64) -> Self {
        Self {
            lr,
            momentum,
            velocity: BTreeMap::new(),
        }
    }
}

impl Optimizer for Momentum {
    fn update(&mut self, params: &mut ParamsMut<'_>, grads: &Grads) -> Result<()> {
        check_aligned(params, grads)?;
        for (name, p) in params.iter_mut() {
            let g = grads[name].as_slice();
            let v = state(&mut self.velocity, name, g.len());
            for ((w, vi), &gi) in p.as_mut_slice().iter_mut().zip(v.iter_mut()).zip(g) {
                *vi = self.momentum * *vi - self.lr * gi;
                *w += *vi;
            }
        }
        Ok(())
    }

    fn lr(&self) -> f64 {
        self.lr
    }

    fn set_lr(&mut self, lr: f64) {
        self.lr = lr;
    }
}

/// Per-coordinate learning rates from accumulated squared gradients.
#[derive(Debug, Clone)]
pub struct AdaGrad {
    pub lr: f64,
    pub epsilon: f64,
    h: BTreeMap<String, Vec<f64>>,
}

impl AdaGrad {
    pub fn new(lr: f64) -> Self {
        Self {
            lr,
            epsilon: 1e-7,
            h: BTreeMap::new(),
        }
    }
}

impl Optimizer for AdaGrad {
    fn update(&mut self, params: &mut ParamsMut<'_>, grads: &Grads) -> Result<()> {
        check_aligned(params, grads)?;
        for (name, p) in params.iter_mut() {
            let g = grads[name].as_slice();
            let h = state(&mut self.h, name, g.len());
            for ((w, hi), &gi) in p.as_mut_slice().iter_mut().zip(h.iter_mut()).zip(g) {
                *hi += gi * gi;
                *w -= self.lr * gi / (hi.sqrt() + self.epsilon);
            }
        }
        Ok(())
    }

    fn lr(&self) -> f64 {
        self.lr
    }

    fn set_lr(&mut self, lr: f64) {
        self.lr = lr;
    }
}

/// Adam with bias-corrected first and second moments.
#[derive(Debug, Clone)]
pub struct Adam {
    pub lr: f64,
    pub beta1: f64,
    pub beta2: f64,
    pub epsilon: f64,
    m: BTreeMap<String, Vec<f64>>,
    v: BTreeMap<String, Vec<f64>>,
    t: i32,
}

impl Adam {
    pub fn new(lr: f64) -> Self {
        Self::with_betas(lr, 0.9, 0.999)
    }

    pub fn with_betas(lr: f64, beta1: f64, beta2: f64) -> Self {
        Self {
            lr,
            beta1,
            beta2,
            epsilon: 1e-8,
            m: BTreeMap::new(),
            v: BTreeMap::new(),
            t: 0,
        }
    }

    /// Number of updates applied so far.
    pub fn steps(&self) -> i32 {
        self.t
    }
}

impl Optimizer for Adam {
    fn update(&mut self, params: &mut ParamsMut<'_>, grads: &Grads) -> Result<()> {
        check_aligned(params, grads)?;
        self.t += 1;
        let bc1 = 1.0 - self.beta1.powi(self.t);
        let bc2 = 1.0 - self.beta2.powi(self.t);

        for (name, p) in params.iter_mut() {
            let g = grads[name].as_slice();
            let m = state(&mut self.m, name, g.len());
            let v = state(&mut self.v, name, g.len());
            let data = p.as_mut_slice();
            for j in 0..data.len() {
                let gj = g[j];
                m[j] = self.beta1 * m[j] + (1.0 - self.beta1) * gj;
                v[j] = self.beta2 * v[j] + (1.0 - self.beta2) * gj * gj;
                let m_hat = m[j] / bc1;
                let v_hat = v[j] / bc2;
                data[j] -= self.lr * m_hat / (v_hat.sqrt() + self.epsilon);
            }
        }
        Ok(())
    }

    fn lr(&self) -> f64 {
        self.lr
    }

    fn set_lr(&mut self, lr: f64) {
        self.lr = lr;
    }
}
