use seasonality_core::BucketScheme;
use serde::Serialize;

/// Slot layout of one bucket scheme.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SchemeLabels {
    pub scheme: BucketScheme,
    pub name: &'static str,
    pub slots: usize,
    pub labels: Vec<String>,
}

pub fn run() -> Vec<SchemeLabels> {
    BucketScheme::ALL
        .into_iter()
        .map(|scheme| SchemeLabels {
            scheme,
            name: scheme.as_str(),
            slots: scheme.slot_count(),
            labels: scheme.labels(),
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn lists_every_scheme_with_matching_label_counts() {
        let schemes = run();
        assert_eq!(schemes.len(), 3);
        for scheme in &schemes {
            assert_eq!(scheme.labels.len(), scheme.slots);
        }
        assert_eq!(schemes[0].labels[0], "Monday");
        assert_eq!(schemes[1].labels[52], "52");
        assert_eq!(schemes[2].labels[11], "December");
    }
}
