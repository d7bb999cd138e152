use crate::param::randn_matrix;
use crate::{Error, Layer, Param, ParamMut, Result, Rng, WeightInit};
use sumi_la::Matrix;
use sumi_tensor::Tensor4D;

/// Fully-connected layer: `y = x·W + b`, `W` is `[in, out]`, `b` is `[1, out]`.
///
/// On the image path the input is flattened to `(N, C·H·W)` and the output is
/// laid out `(N, 1, 1, out)`.
#[derive(Debug, Clone)]
pub struct Affine {
    pub weight: Matrix,
    pub bias: Matrix,
    cached_input: Option<Matrix>,
    input_dims: Option<[usize; 4]>,
    dw: Option<Matrix>,
    db: Option<Matrix>,
}

impl Affine {
    pub fn new(weight: Matrix, bias: Matrix) -> Result<Self> {
        if bias.rows() != 1 || bias.cols() != weight.cols() {
            return Err(sumi_la::Error::shape_mismatch(
                "affine bias",
                &[1, weight.cols()],
                &[bias.rows(), bias.cols()],
            )
            .into());
        }
        Ok(Self {
            weight,
            bias,
            cached_input: None,
            input_dims: None,
            dw: None,
            db: None,
        })
    }

    /// Random weights, zero bias.
    pub fn init(inputs: usize, outputs: usize, init: WeightInit, rng: &mut Rng) -> Result<Self> {
        let weight = randn_matrix(inputs, outputs, init, rng)?;
        let bias = Matrix::zeros(1, outputs)?;
        Self::new(weight, bias)
    }

    pub fn dw(&self) -> Option<&Matrix> {
        self.dw.as_ref()
    }

    pub fn db(&self) -> Option<&Matrix> {
        self.db.as_ref()
    }

    fn forward_matrix(&mut self, x: Matrix) -> Result<Matrix> {
        let out = x.par_dot(&self.weight)?.add_or_broadcast(&self.bias)?;
        self.cached_input = Some(x);
        Ok(out)
    }

    fn backward_matrix(&mut self, dout: &Matrix) -> Result<Matrix> {
        let x = self
            .cached_input
            .as_ref()
            .ok_or(Error::BackwardBeforeForward("Affine"))?;
        let dx = dout.par_dot(&self.weight.transpose())?;
        self.dw = Some(x.transpose().par_dot(dout)?);
        self.db = Some(dout.sum_axis(0)?);
        Ok(dx)
    }
}

impl Layer<Matrix> for Affine {
    fn forward(&mut self, input: &Matrix) -> Result<Matrix> {
        self.input_dims = None;
        self.forward_matrix(input.clone())
    }

    fn backward(&mut self, dout: &Matrix) -> Result<Matrix> {
        self.backward_matrix(dout)
    }

    fn params_mut(&mut self) -> Vec<(&'static str, ParamMut<'_>)> {
        vec![("W", (&mut self.weight).into()), ("b", (&mut self.bias).into())]
    }

    fn grads(&self) -> Vec<(&'static str, Param)> {
        affine_grads(&self.dw, &self.db)
    }
}

impl Layer<Tensor4D> for Affine {
    fn forward(&mut self, input: &Tensor4D) -> Result<Tensor4D> {
        self.input_dims = Some(input.dims());
        let out = self.forward_matrix(input.flatten()?)?;
        let dims = [out.rows(), 1, 1, out.cols()];
        Ok(Tensor4D::unflatten(&out, dims)?)
    }

    fn backward(&mut self, dout: &Tensor4D) -> Result<Tensor4D> {
        let dims = self
            .input_dims
            .ok_or(Error::BackwardBeforeForward("Affine"))?;
        let dx = self.backward_matrix(&dout.flatten()?)?;
        Ok(Tensor4D::unflatten(&dx, dims)?)
    }

    fn params_mut(&mut self) -> Vec<(&'static str, ParamMut<'_>)> {
        vec![("W", (&mut self.weight).into()), ("b", (&mut self.bias).into())]
    }

    fn grads(&self) -> Vec<(&'static str, Param)> {
        affine_grads(&self.dw, &self.db)
    }
}

fn affine_grads(dw: &Option<Matrix>, db: &Option<Matrix>) -> Vec<(&'static str, Param)> {
    match (dw, db) {
        (Some(dw), Some(db)) => vec![("W", dw.clone().into()), ("b", db.clone().into())],
        _ => Vec::new(),
    }
}

/// Logistic activation. Caches its output.
#[derive(Debug, Clone, Default)]
pub struct Sigmoid {
    out: Option<Matrix>,
}

impl Sigmoid {
    pub fn new() -> Self {
        Self::default()
    }
}

impl Layer<Matrix> for Sigmoid {
    fn forward(&mut self, input: &Matrix) -> Result<Matrix> {
        let out = input.map(|x| 1.0 / (1.0 + (-x).exp()));
        self.out = Some(out.clone());
        Ok(out)
    }

    fn backward(&mut self, dout: &Matrix) -> Result<Matrix> {
        let out = self
            .out
            .as_ref()
            .ok_or(Error::BackwardBeforeForward("Sigmoid"))?;
        let local = out.map(|y| y * (1.0 - y));
        Ok(dout.mul(&local)?)
    }
}

/// Rectifier. Records which entries were clipped (`x <= 0`).
#[derive(Debug, Clone, Default)]
pub struct Relu {
    mask: Option<Vec<bool>>,
}

impl Relu {
    pub fn new() -> Self {
        Self::default()
    }

    fn clip(&mut self, input: &[f64], out: &mut [f64]) {
        let mut mask = Vec::with_capacity(input.len());
        for (o, &x) in out.iter_mut().zip(input) {
            let clipped = x <= 0.0;
            mask.push(clipped);
            *o = if clipped { 0.0 } else { x };
        }
        self.mask = Some(mask);
    }

    fn pass(&self, dout: &[f64], dx: &mut [f64]) -> Result<()> {
        let mask = self
            .mask
            .as_ref()
            .ok_or(Error::BackwardBeforeForward("Relu"))?;
        if mask.len() != dout.len() {
            return Err(sumi_la::Error::shape_mismatch("relu backward", &[mask.len()], &[dout.len()]).into());
        }
        for ((d, &g), &clipped) in dx.iter_mut().zip(dout).zip(mask) {
            *d = if clipped { 0.0 } else { g };
        }
        Ok(())
    }
}

impl Layer<Matrix> for Relu {
    fn forward(&mut self, input: &Matrix) -> Result<Matrix> {
        let mut out = input.zeros_like();
        self.clip(input.as_slice(), out.as_mut_slice());
        Ok(out)
    }

    fn backward(&mut self, dout: &Matrix) -> Result<Matrix> {
        let mut dx = dout.zeros_like();
        self.pass(dout.as_slice(), dx.as_mut_slice())?;
        Ok(dx)
    }
}

impl Layer<Tensor4D> for Relu {
    fn forward(&mut self, input: &Tensor4D) -> Result<Tensor4D> {
        let mut out = input.clone();
        self.clip(input.data(), out.data_mut());
        Ok(out)
    }

    fn backward(&mut self, dout: &Tensor4D) -> Result<Tensor4D> {
        let mut dx = dout.clone();
        self.pass(dout.data(), dx.data_mut())?;
        Ok(dx)
    }
}

/// Named layers run in insertion order. A sequence may hold another
/// sequence; its weighted layers are numbered as if spliced in place.
pub struct Sequential<X> {
    layers: Vec<(String, Box<dyn Layer<X>>)>,
}

impl<X> Default for Sequential<X> {
    fn default() -> Self {
        Self { layers: Vec::new() }
    }
}

impl<X> Sequential<X> {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, name: impl Into<String>, layer: impl Layer<X> + 'static) {
        self.layers.push((name.into(), Box::new(layer)));
    }

    pub fn with(mut self, name: impl Into<String>, layer: impl Layer<X> + 'static) -> Self {
        self.push(name, layer);
        self
    }

    pub fn len(&self) -> usize {
        self.layers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.layers.is_empty()
    }

    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.layers.iter().map(|(n, _)| n.as_str())
    }

    pub fn layers(&self) -> impl Iterator<Item = &dyn Layer<X>> {
        self.layers.iter().map(|(_, l)| l.as_ref())
    }
}

impl<X> Layer<X> for Sequential<X> {
    fn forward(&mut self, input: &X) -> Result<X> {
        let mut layers = self.layers.iter_mut();
        let Some((_, first)) = layers.next() else {
            return Err(sumi_la::Error::Configuration("empty layer sequence".into()).into());
        };
        let mut x = first.forward(input)?;
        for (_, layer) in layers {
            x = layer.forward(&x)?;
        }
        Ok(x)
    }

    fn backward(&mut self, dout: &X) -> Result<X> {
        let mut layers = self.layers.iter_mut().rev();
        let Some((_, last)) = layers.next() else {
            return Err(sumi_la::Error::Configuration("empty layer sequence".into()).into());
        };
        let mut g = last.backward(dout)?;
        for (_, layer) in layers {
            g = layer.backward(&g)?;
        }
        Ok(g)
    }

    fn param_groups_mut<'a>(&'a mut self, out: &mut Vec<Vec<(&'static str, ParamMut<'a>)>>) {
        for (_, layer) in self.layers.iter_mut() {
            layer.param_groups_mut(out);
        }
    }

    fn grad_groups(&self, out: &mut Vec<Vec<(&'static str, Param)>>) {
        for (_, layer) in &self.layers {
            layer.grad_groups(out);
        }
    }
}
