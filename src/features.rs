use std::collections::HashMap;

pub const ROLLING_STATS: [&str; 5] = ["shots", "sog", "assists", "player_count", "avg_player_year"];

pub const PREDICTIVE_FEATURES: [&str; 15] = [
    "shots_rolling3",
    "sog_rolling3",
    "assists_rolling3",
    "player_count_rolling3",
    "avg_player_year_rolling3",
    "win_rate_rolling5",
    "is_home",
    "for",
    "mid",
    "shots_form_diff",
    "sog_form_diff",
    "assists_form_diff",
    "player_count_form_diff",
    "avg_player_year_form_diff",
    "win_rate_diff",
];

pub const ANALYTIC_FEATURES: [&str; 19] = [
    "shots",
    "sog",
    "assists",
    "player_count",
    "avg_player_year",
    "for",
    "mid",
    "is_home",
    "G_mean",
    "SH_mean",
    "SOG_mean",
    "A_mean",
    "shot_diff",
    "sog_diff",
    "assist_diff",
    "G_mean_diff",
    "SH_mean_diff",
    "SOG_mean_diff",
    "A_mean_diff",
];

#[derive(Debug, Clone, Default, PartialEq)]
pub struct FeatureVector {
    values: HashMap<String, f64>,
}

impl FeatureVector {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_pairs<'a, I>(pairs: I) -> Self
    where
        I: IntoIterator<Item = (&'a str, f64)>,
    {
        let mut out = Self::new();
        for (name, value) in pairs {
            out.set(name, value);
        }
        out
    }

    pub fn set(&mut self, name: &str, value: f64) {
        let v = if value.is_finite() { value } else { 0.0 };
        self.values.insert(name.to_string(), v);
    }

    pub fn get(&self, name: &str) -> Option<f64> {
        self.values.get(name).copied()
    }

    pub fn value(&self, name: &str) -> f64 {
        self.get(name).unwrap_or(0.0)
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.values.keys().map(String::as_str)
    }

    /// Row in `schema` order; absent columns are zero, extra columns are
    /// ignored.
    pub fn aligned<S: AsRef<str>>(&self, schema: &[S]) -> Vec<f64> {
        schema.iter().map(|name| self.value(name.as_ref())).collect()
    }

    pub fn restricted<S: AsRef<str>>(&self, schema: &[S]) -> FeatureVector {
        FeatureVector::from_pairs(
            schema
                .iter()
                .map(|name| (name.as_ref(), self.value(name.as_ref()))),
        )
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct FeatureDelta {
    pub name: String,
    pub before: f64,
    pub after: f64,
}

impl FeatureDelta {
    pub fn change(&self) -> f64 {
        self.after - self.before
    }
}

pub fn feature_deltas<S: AsRef<str>>(
    before: &FeatureVector,
    after: &FeatureVector,
    schema: &[S],
) -> Vec<FeatureDelta> {
    schema
        .iter()
        .map(|name| FeatureDelta {
            name: name.as_ref().to_string(),
            before: before.value(name.as_ref()),
            after: after.value(name.as_ref()),
        })
        .collect()
}
