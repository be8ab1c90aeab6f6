use serde::{Serialize, Deserialize};

/// Maps activity names to class indices. Classes are sorted so the same set
/// of names always yields the same indices.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct LabelEncoder {
    classes: Vec<String>,
}

impl LabelEncoder {
    pub fn fit<I, S>(labels: I) -> LabelEncoder
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let mut classes: Vec<String> = labels.into_iter().map(|s| s.as_ref().to_string()).collect();
        classes.sort();
        classes.dedup();
        LabelEncoder { classes }
    }

    pub fn encode(&self, label: &str) -> Option<usize> {
        self.classes.binary_search_by(|c| c.as_str().cmp(label)).ok()
    }

    pub fn decode(&self, index: usize) -> Option<&str> {
        self.classes.get(index).map(String::as_str)
    }

    pub fn classes(&self) -> &[String] {
        &self.classes
    }

    pub fn len(&self) -> usize {
        self.classes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.classes.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn sorted_and_deduplicated() {
        let enc = LabelEncoder::fit(["walk", "run", "walk", "jump"]);
        assert_eq!(enc.classes(), &["jump", "run", "walk"]);
        assert_eq!(enc.encode("run"), Some(1));
        assert_eq!(enc.decode(2), Some("walk"));
        assert_eq!(enc.encode("sit"), None);
        assert_eq!(enc.decode(3), None);
    }
}
