use std::collections::HashMap;

/// One observed sample.
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize))]
pub struct MetricSample {
    /// Metric name with the label set stripped.
    #[cfg_attr(feature = "serde", serde(skip))]
    pub name: String,
    /// Full metric+labels text, e.g. `foo_total{path="/a"}`.
    pub line: String,
    pub value: f64,
}

impl MetricSample {
    /// Label pairs from the `{...}` section of [`MetricSample::line`].
    ///
    /// Best effort: malformed label sections yield whatever pairs could be read
    /// before the first problem.
    pub fn labels(&self) -> Vec<(String, String)> {
        let Some(open) = self.line.find('{') else {
            return Vec::new();
        };
        let body = self.line[open + 1..]
            .strip_suffix('}')
            .unwrap_or(&self.line[open + 1..]);

        let mut labels = Vec::new();
        let mut chars = body.chars().peekable();
        loop {
            while matches!(chars.peek(), Some(',') | Some(' ')) {
                chars.next();
            }
            let key: String = chars.by_ref().take_while(|c| *c != '=').collect();
            if key.is_empty() || chars.next() != Some('"') {
                break;
            }

            let mut value = String::new();
            let mut closed = false;
            while let Some(c) = chars.next() {
                match c {
                    '\\' => match chars.next() {
                        Some('n') => value.push('\n'),
                        Some(other) => value.push(other),
                        None => break,
                    },
                    '"' => {
                        closed = true;
                        break;
                    }
                    other => value.push(other),
                }
            }
            if !closed {
                break;
            }
            labels.push((key.trim().to_string(), value));
        }
        labels
    }

    /// Value of a single label, if present.
    pub fn label(&self, key: &str) -> Option<String> {
        self.labels()
            .into_iter()
            .find(|(k, _)| k == key)
            .map(|(_, v)| v)
    }
}

/// Samples grouped by metric name.
///
/// Names iterate in first-seen order; samples under a name keep input order.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct MetricSet {
    families: Vec<(String, Vec<MetricSample>)>,
    index: HashMap<String, usize>,
}

impl MetricSet {
    pub(crate) fn push(&mut self, sample: MetricSample) {
        match self.index.get(&sample.name) {
            Some(&i) => self.families[i].1.push(sample),
            None => {
                self.index.insert(sample.name.clone(), self.families.len());
                self.families.push((sample.name.clone(), vec![sample]));
            }
        }
    }

    /// Samples recorded under `name`.
    pub fn get(&self, name: &str) -> Option<&[MetricSample]> {
        self.index
            .get(name)
            .map(|&i| self.families[i].1.as_slice())
    }

    /// Sum of every sample under `name`. Suits counters split by label.
    pub fn sum(&self, name: &str) -> Option<f64> {
        self.get(name).map(|samples| samples.iter().map(|s| s.value).sum())
    }

    /// Value of the first sample under `name`. Suits single-valued gauges.
    pub fn first(&self, name: &str) -> Option<f64> {
        self.get(name)
            .and_then(|samples| samples.first())
            .map(|s| s.value)
    }

    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.families.iter().map(|(name, _)| name.as_str())
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &[MetricSample])> {
        self.families
            .iter()
            .map(|(name, samples)| (name.as_str(), samples.as_slice()))
    }

    /// Number of distinct metric names.
    pub fn len(&self) -> usize {
        self.families.len()
    }

    pub fn is_empty(&self) -> bool {
        self.families.is_empty()
    }

    /// Total number of samples across all names.
    pub fn sample_count(&self) -> usize {
        self.families.iter().map(|(_, s)| s.len()).sum()
    }

    /// Subset containing only names that start with `prefix`.
    pub fn filter_prefix(&self, prefix: &str) -> MetricSet {
        self.filter(|name| name.starts_with(prefix))
    }

    /// Subset containing only names accepted by `keep`.
    pub fn filter(&self, mut keep: impl FnMut(&str) -> bool) -> MetricSet {
        let mut out = MetricSet::default();
        for (name, samples) in &self.families {
            if keep(name) {
                for sample in samples {
                    out.push(sample.clone());
                }
            }
        }
        out
    }
}

#[cfg(feature = "serde")]
impl serde::Serialize for MetricSet {
    fn serialize<S: serde::Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        use serde::ser::SerializeMap;
        let mut map = serializer.serialize_map(Some(self.families.len()))?;
        for (name, samples) in &self.families {
            map.serialize_entry(name, samples)?;
        }
        map.end()
    }
}
