//! Support vector regression over LIBSVM model files
//!
//! A model file is LIBSVM's text format: `key value` header lines, an `SV`
//! line, then one support vector per line as `coef index:value ...`.
//! Feature `i` of the feature definition list is node index `i`.

use super::Predictor;
use crate::error::{ResemblaError, Result};
use crate::sequence::FeatureMap;
use std::path::Path;
use tracing::debug;

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Kernel {
    Linear,
    Polynomial { gamma: f64, coef0: f64, degree: i32 },
    Rbf { gamma: f64 },
    Sigmoid { gamma: f64, coef0: f64 },
}

impl Kernel {
    fn apply(&self, a: &[(usize, f64)], b: &[(usize, f64)]) -> f64 {
        match *self {
            Self::Linear => dot(a, b),
            Self::Polynomial {
                gamma,
                coef0,
                degree,
            } => (gamma * dot(a, b) + coef0).powi(degree),
            Self::Rbf { gamma } => (-gamma * squared_distance(a, b)).exp(),
            Self::Sigmoid { gamma, coef0 } => (gamma * dot(a, b) + coef0).tanh(),
        }
    }
}

/// Dot product of two sparse vectors sorted by index
fn dot(a: &[(usize, f64)], b: &[(usize, f64)]) -> f64 {
    let (mut i, mut j, mut sum) = (0, 0, 0.0);
    while i < a.len() && j < b.len() {
        match a[i].0.cmp(&b[j].0) {
            std::cmp::Ordering::Equal => {
                sum += a[i].1 * b[j].1;
                i += 1;
                j += 1;
            }
            std::cmp::Ordering::Less => i += 1,
            std::cmp::Ordering::Greater => j += 1,
        }
    }
    sum
}

fn squared_distance(a: &[(usize, f64)], b: &[(usize, f64)]) -> f64 {
    let (mut i, mut j, mut sum) = (0, 0, 0.0);
    while i < a.len() || j < b.len() {
        let d = match (a.get(i), b.get(j)) {
            (Some(x), Some(y)) if x.0 == y.0 => {
                i += 1;
                j += 1;
                x.1 - y.1
            }
            (Some(x), Some(y)) if x.0 < y.0 => {
                i += 1;
                x.1
            }
            (Some(x), None) => {
                i += 1;
                x.1
            }
            (_, Some(y)) => {
                j += 1;
                y.1
            }
            (None, None) => break,
        };
        sum += d * d;
    }
    sum
}

/// Epsilon- or nu-SVR model
#[derive(Debug, Clone)]
pub struct SvrPredictor {
    features: Vec<String>,
    kernel: Kernel,
    rho: f64,
    support_vectors: Vec<(f64, Vec<(usize, f64)>)>,
}

impl SvrPredictor {
    /// Load a model whose node indexes follow `features`
    pub fn load(features: Vec<String>, path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path).map_err(|e| ResemblaError::io(path, e))?;
        let model = Self::parse(features, path, &content)?;
        debug!(
            path = %path.display(),
            support_vectors = model.support_vectors.len(),
            kernel = ?model.kernel,
            "loaded svr model"
        );
        Ok(model)
    }

    pub(crate) fn parse(features: Vec<String>, path: &Path, content: &str) -> Result<Self> {
        let mut kernel_type = None;
        let (mut gamma, mut coef0, mut degree) = (0.0, 0.0, 3);
        let mut rho = None;
        let mut lines = content.lines().enumerate();

        for (i, line) in lines.by_ref() {
            let line = line.trim();
            if line == "SV" {
                break;
            }
            let Some((key, value)) = line.split_once(' ') else {
                continue;
            };
            let number = || {
                value.trim().parse::<f64>().map_err(|_| {
                    ResemblaError::table(path, i + 1, format!("{} is not a number: '{}'", key, value))
                })
            };
            match key {
                "svm_type" if !matches!(value, "epsilon_svr" | "nu_svr") => {
                    return Err(ResemblaError::Config(format!(
                        "'{}' holds a {} model, not a regression model",
                        path.display(),
                        value
                    )));
                }
                "kernel_type" => kernel_type = Some(value.to_string()),
                "gamma" => gamma = number()?,
                "coef0" => coef0 = number()?,
                "degree" => degree = number()? as i32,
                "rho" => rho = Some(number()?),
                _ => {}
            }
        }

        let kernel = match kernel_type.as_deref() {
            Some("linear") => Kernel::Linear,
            Some("polynomial") => Kernel::Polynomial {
                gamma,
                coef0,
                degree,
            },
            Some("rbf") => Kernel::Rbf { gamma },
            Some("sigmoid") => Kernel::Sigmoid { gamma, coef0 },
            other => {
                return Err(ResemblaError::Config(format!(
                    "'{}': unsupported kernel {:?}",
                    path.display(),
                    other
                )))
            }
        };
        let rho = rho.ok_or_else(|| {
            ResemblaError::Config(format!("'{}': model has no rho", path.display()))
        })?;

        let mut support_vectors = Vec::new();
        for (i, line) in lines {
            let mut fields = line.split_whitespace();
            let Some(coef) = fields.next() else {
                continue;
            };
            let bad = |what: &str| ResemblaError::table(path, i + 1, format!("malformed {}", what));
            let coef = coef.parse::<f64>().map_err(|_| bad("coefficient"))?;
            let mut nodes = fields
                .map(|node| {
                    let (index, value) = node.split_once(':').ok_or_else(|| bad("node"))?;
                    Ok((
                        index.parse::<usize>().map_err(|_| bad("node index"))?,
                        value.parse::<f64>().map_err(|_| bad("node value"))?,
                    ))
                })
                .collect::<Result<Vec<_>>>()?;
            nodes.sort_by_key(|&(index, _)| index);
            support_vectors.push((coef, nodes));
        }

        Ok(Self {
            features,
            kernel,
            rho,
            support_vectors,
        })
    }

    fn nodes(&self, features: &FeatureMap) -> Vec<(usize, f64)> {
        self.features
            .iter()
            .enumerate()
            .filter_map(|(i, name)| features.get(name).map(|&v| (i, v)))
            .collect()
    }
}

impl Predictor for SvrPredictor {
    fn predict(&self, features: &FeatureMap) -> Result<f64> {
        let x = self.nodes(features);
        let sum: f64 = self
            .support_vectors
            .iter()
            .map(|(coef, sv)| coef * self.kernel.apply(sv, &x))
            .sum();
        Ok(sum - self.rho)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const LINEAR: &str = "\
svm_type epsilon_svr
kernel_type linear
nr_class 2
total_sv 2
rho -0.1
SV
0.5 0:1 1:0.5
0.25 1:2
";

    fn names() -> Vec<String> {
        vec!["base_similarity".into(), "keyword_match".into()]
    }

    fn features(pairs: &[(&str, f64)]) -> FeatureMap {
        pairs.iter().map(|(k, v)| (k.to_string(), *v)).collect()
    }

    #[test]
    fn test_linear_model() {
        let model = SvrPredictor::parse(names(), Path::new("model"), LINEAR).unwrap();
        assert_eq!(model.kernel, Kernel::Linear);
        // w = 0.5 * (1, 0.5) + 0.25 * (0, 2) = (0.5, 0.75)
        let score = model
            .predict(&features(&[("base_similarity", 0.8), ("keyword_match", 0.4)]))
            .unwrap();
        assert!((score - (0.4 + 0.3 + 0.1)).abs() < 1e-12);

        // absent features are zero
        let score = model.predict(&features(&[("base_similarity", 1.0)])).unwrap();
        assert!((score - 0.6).abs() < 1e-12);
    }

    #[test]
    fn test_rbf_model() {
        let content = "svm_type nu_svr\nkernel_type rbf\ngamma 0.5\nrho 0\nSV\n1 0:1\n";
        let model = SvrPredictor::parse(names(), Path::new("model"), content).unwrap();
        let at_sv = model.predict(&features(&[("base_similarity", 1.0)])).unwrap();
        assert!((at_sv - 1.0).abs() < 1e-12);
        let away = model
            .predict(&features(&[("base_similarity", 0.0), ("keyword_match", 1.0)]))
            .unwrap();
        assert!((away - (-1.0f64).exp()).abs() < 1e-12);
    }

    #[test]
    fn test_classification_model_is_rejected() {
        let content = "svm_type c_svc\nkernel_type linear\nrho 0\nSV\n";
        assert!(matches!(
            SvrPredictor::parse(names(), Path::new("model"), content),
            Err(ResemblaError::Config(_))
        ));
    }

    #[test]
    fn test_malformed_support_vector_reports_line() {
        let content = "svm_type epsilon_svr\nkernel_type linear\nrho 0\nSV\n1 0:x\n";
        assert!(matches!(
            SvrPredictor::parse(names(), Path::new("model"), content),
            Err(ResemblaError::Table { line: 5, .. })
        ));
    }

    #[test]
    fn test_sparse_distance() {
        assert_eq!(squared_distance(&[(0, 1.0), (2, 2.0)], &[(1, 1.0), (2, 1.0)]), 3.0);
        assert_eq!(dot(&[(0, 1.0), (2, 2.0)], &[(1, 1.0), (2, 1.0)]), 2.0);
    }
}
