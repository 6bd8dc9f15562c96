use crate::params::Params;
use crate::profiles::SersicProfileTable;
use crate::source::Source;

/// Ordered list of sources. The order fixes the layout of the catalog's
/// part of the parameter vector.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Catalog {
    sources: Vec<Source>,
}

impl Catalog {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, source: impl Into<Source>) {
        self.sources.push(source.into());
    }

    pub fn len(&self) -> usize {
        self.sources.len()
    }

    pub fn is_empty(&self) -> bool {
        self.sources.is_empty()
    }

    pub fn get(&self, i: usize) -> Option<&Source> {
        self.sources.get(i)
    }

    pub fn get_mut(&mut self, i: usize) -> Option<&mut Source> {
        self.sources.get_mut(i)
    }

    pub fn sources(&self) -> &[Source] {
        &self.sources
    }

    pub fn iter(&self) -> std::slice::Iter<'_, Source> {
        self.sources.iter()
    }

    pub fn iter_mut(&mut self) -> std::slice::IterMut<'_, Source> {
        self.sources.iter_mut()
    }

    pub fn freeze_all(&mut self) {
        self.sources.iter_mut().for_each(Params::freeze_all);
    }

    pub fn thaw_all(&mut self) {
        self.sources.iter_mut().for_each(Params::thaw_all);
    }

    /// Thawed parameters across all sources.
    pub fn num_params(&self) -> usize {
        self.sources.iter().map(Params::num_params).sum()
    }

    /// Thawed parameter names, prefixed with the source index.
    pub fn param_names(&self) -> Vec<String> {
        self.sources
            .iter()
            .enumerate()
            .flat_map(|(i, s)| {
                s.param_names()
                    .into_iter()
                    .map(move |name| format!("source{i}.{name}"))
            })
            .collect()
    }

    pub fn get_params(&self) -> Vec<f64> {
        self.sources.iter().flat_map(|s| s.get_params()).collect()
    }

    /// Consume `values` in source order.
    ///
    /// # Panics
    /// If `values.len() != self.num_params()`.
    pub fn set_params(&mut self, values: &[f64]) {
        assert_eq!(
            values.len(),
            self.num_params(),
            "expected {} catalog parameter values, got {}",
            self.num_params(),
            values.len()
        );
        let mut rest = values;
        for source in &mut self.sources {
            let (head, tail) = rest.split_at(source.num_params());
            source.set_params(head);
            rest = tail;
        }
    }

    pub fn constrain(&mut self) {
        self.sources.iter_mut().for_each(Params::constrain);
    }

    pub fn clamp_to_table(&mut self, profiles: &SersicProfileTable) {
        for source in &mut self.sources {
            source.clamp_to_table(profiles);
        }
    }
}

impl FromIterator<Source> for Catalog {
    fn from_iter<I: IntoIterator<Item = Source>>(iter: I) -> Self {
        Self {
            sources: iter.into_iter().collect(),
        }
    }
}

impl From<Vec<Source>> for Catalog {
    fn from(sources: Vec<Source>) -> Self {
        Self { sources }
    }
}

impl<'a> IntoIterator for &'a Catalog {
    type Item = &'a Source;
    type IntoIter = std::slice::Iter<'a, Source>;

    fn into_iter(self) -> Self::IntoIter {
        self.sources.iter()
    }
}
