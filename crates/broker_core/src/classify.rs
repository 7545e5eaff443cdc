use serde::Deserialize;

use crate::types::OperationKind;

/// One keyword to operation-kind rule. Keywords are written in plain ASCII
/// uppercase; matching folds accents so "Depósito" still hits DEPOSITO.
#[derive(Debug, Clone, Deserialize)]
pub struct KeywordRule {
    pub keyword: String,
    pub kind: OperationKind,
}

impl KeywordRule {
    pub fn new(keyword: &str, kind: OperationKind) -> Self {
        KeywordRule {
            keyword: keyword.to_string(),
            kind,
        }
    }
}

/// Classifies free-text operation labels into one of the closed operation
/// kinds via ordered substring rules, with an explicit fallback when nothing
/// matches.
#[derive(Debug, Clone, Deserialize)]
pub struct KeywordClassifier {
    #[serde(default)]
    pub rules: Vec<KeywordRule>,
    pub fallback: OperationKind,
}

impl KeywordClassifier {
    pub fn new(rules: Vec<KeywordRule>, fallback: OperationKind) -> Self {
        KeywordClassifier { rules, fallback }
    }

    /// Constant classifier for formats whose file structure fixes the kind
    /// of every row (e.g. a mutual-fund-only statement).
    pub fn fixed(kind: OperationKind) -> Self {
        KeywordClassifier {
            rules: Vec::new(),
            fallback: kind,
        }
    }

    pub fn classify(&self, label: &str) -> OperationKind {
        let folded = fold_for_match(label);
        for rule in &self.rules {
            if folded.contains(&fold_for_match(&rule.keyword)) {
                return rule.kind;
            }
        }
        self.fallback
    }
}

/// Uppercase and strip Spanish accents so keyword tables stay plain ASCII.
fn fold_for_match(s: &str) -> String {
    s.to_uppercase()
        .chars()
        .map(|c| match c {
            'Á' | 'À' | 'Â' | 'Ä' => 'A',
            'É' | 'È' | 'Ê' | 'Ë' => 'E',
            'Í' | 'Ì' | 'Î' | 'Ï' => 'I',
            'Ó' | 'Ò' | 'Ô' | 'Ö' => 'O',
            'Ú' | 'Ù' | 'Û' | 'Ü' => 'U',
            'Ñ' => 'N',
            other => other,
        })
        .collect()
}

/// The default Spanish-label rule set shared by keyword-classified formats.
pub fn default_rules() -> Vec<KeywordRule> {
    vec![
        KeywordRule::new("COMPRA", OperationKind::Trade),
        KeywordRule::new("VENTA", OperationKind::Trade),
        KeywordRule::new("TRANSFERENCIA", OperationKind::MonetaryFlow),
        KeywordRule::new("DEPOSITO", OperationKind::SecurityFlow),
        KeywordRule::new("RETIRO", OperationKind::SecurityFlow),
        KeywordRule::new("FONDO", OperationKind::MutualFund),
    ]
}

#[cfg(test)]
mod tests {
    use super::*;

    fn classifier() -> KeywordClassifier {
        KeywordClassifier::new(default_rules(), OperationKind::MonetaryFlow)
    }

    #[test]
    fn test_trade_labels() {
        assert_eq!(
            classifier().classify("Compra de Acciones"),
            OperationKind::Trade
        );
        assert_eq!(classifier().classify("VENTA BYMA"), OperationKind::Trade);
    }

    #[test]
    fn test_transfer_label() {
        assert_eq!(
            classifier().classify("Transferencia Recibida"),
            OperationKind::MonetaryFlow
        );
    }

    #[test]
    fn test_accented_deposit_label() {
        assert_eq!(
            classifier().classify("DEPÓSITO EN EFECTIVO"),
            OperationKind::SecurityFlow
        );
        assert_eq!(
            classifier().classify("Depósito en efectivo"),
            OperationKind::SecurityFlow
        );
        assert_eq!(
            classifier().classify("Retiro de Títulos"),
            OperationKind::SecurityFlow
        );
    }

    #[test]
    fn test_fund_label() {
        assert_eq!(
            classifier().classify("Fondo Común"),
            OperationKind::MutualFund
        );
    }

    #[test]
    fn test_unknown_label_falls_back() {
        assert_eq!(
            classifier().classify("Unknown Label"),
            OperationKind::MonetaryFlow
        );
    }

    #[test]
    fn test_fixed_classifier() {
        let fixed = KeywordClassifier::fixed(OperationKind::MutualFund);
        assert_eq!(fixed.classify("Rescate"), OperationKind::MutualFund);
        assert_eq!(fixed.classify("anything"), OperationKind::MutualFund);
    }
}
