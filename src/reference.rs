// 📚 Reference data - consumer laws, ChexSystems dispute types, dispute library

use serde::Serialize;

#[derive(Debug, Clone, Serialize)]
pub struct ConsumerLaw {
    pub title: &'static str,
    pub code: &'static str,
    pub description: &'static str,
    pub rights: &'static [&'static str],
}

#[derive(Debug, Clone, Serialize)]
pub struct ChexDisputeType {
    pub id: &'static str,
    pub title: &'static str,
    pub description: &'static str,
}

impl ChexDisputeType {
    pub fn form_blurb(&self) -> String {
        format!(
            "This form will help you dispute {} on your ChexSystems report.",
            self.title.to_lowercase()
        )
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct LibraryItem {
    pub title: &'static str,
    pub target: &'static str,
}

pub const CONSUMER_LAWS: &[ConsumerLaw] = &[
    ConsumerLaw {
        title: "Fair Credit Reporting Act (FCRA)",
        code: "15 U.S.C. § 1681",
        description: "Regulates credit reporting agencies and ensures accuracy, fairness, and privacy of consumer information.",
        rights: &[
            "Right to know what's in your credit file",
            "Right to dispute inaccurate information",
            "Right to seek damages for violations",
        ],
    },
    ConsumerLaw {
        title: "Fair and Accurate Credit Transactions Act (FACTA)",
        code: "15 U.S.C. § 1681",
        description: "Amends FCRA to help consumers combat identity theft and improve access to credit information.",
        rights: &[
            "Free annual credit reports",
            "Fraud alerts and credit freezes",
            "Identity theft protection",
        ],
    },
    ConsumerLaw {
        title: "Fair Debt Collection Practices Act (FDCPA)",
        code: "15 U.S.C. § 1692",
        description: "Prohibits abusive, deceptive, and unfair debt collection practices.",
        rights: &[
            "Stop debt collector harassment",
            "Validate debt before payment",
            "Dispute incorrect debt information",
        ],
    },
];

pub const CHEX_DISPUTE_TYPES: &[ChexDisputeType] = &[
    ChexDisputeType {
        id: "incorrect-balance",
        title: "Incorrect Account Balance",
        description: "Dispute wrong balance information on your report",
    },
    ChexDisputeType {
        id: "fraudulent-account",
        title: "Fraudulent Account",
        description: "Report accounts opened without your consent",
    },
    ChexDisputeType {
        id: "expired-items",
        title: "Expired Negative Items",
        description: "Remove items older than 5 years",
    },
    ChexDisputeType {
        id: "incorrect-info",
        title: "Incorrect Personal Info",
        description: "Fix name, SSN, or address errors",
    },
    ChexDisputeType {
        id: "paid-debt",
        title: "Paid Debt Still Showing",
        description: "Remove paid collections or charge-offs",
    },
];

pub const DISPUTE_LIBRARY: &[LibraryItem] = &[
    LibraryItem {
        title: "Equifax Erroneous Eviction",
        target: "Inaccurate Housing Court Data",
    },
    LibraryItem {
        title: "Metro 2 Format Compliance",
        target: "Data Reporting Inconsistencies",
    },
    LibraryItem {
        title: "FCRA 15 USC 1681i",
        target: "Unverified Items",
    },
];

pub fn find_law(title: &str) -> Option<&'static ConsumerLaw> {
    CONSUMER_LAWS.iter().find(|law| law.title == title)
}

pub fn find_chex_dispute(id: &str) -> Option<&'static ChexDisputeType> {
    CHEX_DISPUTE_TYPES.iter().find(|d| d.id == id)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_lookup() {
        let fdcpa = find_law("Fair Debt Collection Practices Act (FDCPA)").unwrap();
        assert_eq!(fdcpa.code, "15 U.S.C. § 1692");
        assert!(find_law("Nope").is_none());

        let paid = find_chex_dispute("paid-debt").unwrap();
        assert_eq!(
            paid.form_blurb(),
            "This form will help you dispute paid debt still showing on your ChexSystems report."
        );
    }

    #[test]
    fn test_chex_ids_unique() {
        let mut ids: Vec<_> = CHEX_DISPUTE_TYPES.iter().map(|d| d.id).collect();
        ids.sort();
        ids.dedup();
        assert_eq!(ids.len(), CHEX_DISPUTE_TYPES.len());
    }
}
