//! Subject normalization and the chapter catalog for classes 11 and 12.

/// Canonical subject names, in display order.
pub const SUBJECTS: &[&str] = &[
    "mathematics",
    "physics",
    "chemistry",
    "biology",
    "economics",
    "accountancy",
    "business_studies",
    "english",
];

/// Normalize a user-typed subject (aliases included) to its canonical name.
pub fn normalize(subject: &str) -> Option<&'static str> {
    let lower = subject.to_lowercase();
    let canonical = match lower.as_str() {
        "maths" | "math" | "mathematics" => "mathematics",
        "bio" | "biology" => "biology",
        "physics" => "physics",
        "chemistry" => "chemistry",
        "economics" => "economics",
        "accountancy" => "accountancy",
        "business" | "business_studies" => "business_studies",
        "english" => "english",
        _ => return None,
    };
    Some(canonical)
}

pub fn display_name(subject: &str) -> String {
    subject
        .split('_')
        .map(|w| {
            let mut chars = w.chars();
            match chars.next() {
                Some(c) => c.to_uppercase().collect::<String>() + chars.as_str(),
                None => String::new(),
            }
        })
        .collect::<Vec<_>>()
        .join(" ")
}

/// Chapter list for `(class_level, subject)`, or None for an unknown pair.
pub fn chapters(class_level: u8, subject: &str) -> Option<&'static [&'static str]> {
    let list: &[&str] = match (class_level, subject) {
        (11, "mathematics") => &[
            "Sets", "Relations and Functions", "Trigonometric Functions",
            "Complex Numbers", "Linear Inequalities", "Permutations and Combinations",
            "Binomial Theorem", "Sequences and Series", "Straight Lines",
            "Conic Sections", "Limits and Derivatives", "Statistics", "Probability",
        ],
        (11, "physics") => &[
            "Units and Measurement", "Motion in a Straight Line", "Motion in a Plane",
            "Laws of Motion", "Work, Energy and Power", "Rotational Motion",
            "Gravitation", "Mechanical Properties of Solids", "Thermodynamics",
            "Kinetic Theory", "Oscillations", "Waves",
        ],
        (11, "chemistry") => &[
            "Basic Concepts of Chemistry", "Structure of Atom",
            "Classification of Elements", "Chemical Bonding",
            "Thermodynamics", "Equilibrium", "Redox Reactions",
            "Organic Chemistry Basics", "Hydrocarbons",
        ],
        (11, "biology") => &[
            "The Living World", "Biological Classification", "Plant Kingdom",
            "Animal Kingdom", "Morphology of Flowering Plants", "Cell: The Unit of Life",
            "Biomolecules", "Cell Cycle and Cell Division", "Photosynthesis",
            "Respiration in Plants", "Body Fluids and Circulation",
        ],
        (11, "economics") => &[
            "Introduction to Economics", "Collection of Data", "Organisation of Data",
            "Measures of Central Tendency", "Correlation", "Indian Economy on the Eve of Independence",
            "Liberalisation, Privatisation and Globalisation", "Poverty", "Human Capital Formation",
        ],
        (11, "accountancy") => &[
            "Introduction to Accounting", "Theory Base of Accounting",
            "Recording of Transactions", "Bank Reconciliation Statement",
            "Trial Balance", "Depreciation", "Financial Statements of Sole Proprietorship",
        ],
        (11, "business_studies") => &[
            "Business, Trade and Commerce", "Forms of Business Organisation",
            "Private, Public and Global Enterprises", "Business Services",
            "Emerging Modes of Business", "Social Responsibility of Business",
            "Sources of Business Finance", "Small Business", "Internal Trade",
        ],
        (11, "english") => &[
            "The Portrait of a Lady", "A Photograph", "We're Not Afraid to Die",
            "Discovering Tut", "The Laburnum Top", "The Adventure",
            "Note Making", "Letter Writing", "Speech Writing",
        ],
        (12, "mathematics") => &[
            "Relations and Functions", "Inverse Trigonometric Functions",
            "Matrices", "Determinants", "Continuity and Differentiability",
            "Applications of Derivatives", "Integrals", "Applications of Integrals",
            "Differential Equations", "Vector Algebra", "Three Dimensional Geometry",
            "Linear Programming", "Probability",
        ],
        (12, "physics") => &[
            "Electric Charges and Fields", "Electrostatic Potential",
            "Current Electricity", "Moving Charges and Magnetism",
            "Electromagnetic Induction", "Alternating Current",
            "Ray Optics", "Wave Optics", "Dual Nature of Radiation and Matter",
            "Atoms", "Nuclei", "Semiconductor Electronics",
        ],
        (12, "chemistry") => &[
            "Solutions", "Electrochemistry", "Chemical Kinetics",
            "The d- and f-Block Elements", "Coordination Compounds",
            "Haloalkanes and Haloarenes", "Alcohols, Phenols and Ethers",
            "Aldehydes, Ketones and Carboxylic Acids", "Amines", "Biomolecules",
        ],
        (12, "biology") => &[
            "Sexual Reproduction in Flowering Plants", "Human Reproduction",
            "Reproductive Health", "Principles of Inheritance and Variation",
            "Molecular Basis of Inheritance", "Evolution", "Human Health and Disease",
            "Microbes in Human Welfare", "Biotechnology", "Ecosystem",
        ],
        (12, "economics") => &[
            "Introduction to Macroeconomics", "National Income Accounting",
            "Money and Banking", "Determination of Income and Employment",
            "Government Budget", "Open Economy Macroeconomics",
            "Consumer Behaviour", "Producer Behaviour", "Market Equilibrium",
        ],
        (12, "accountancy") => &[
            "Accounting for Partnership Firms", "Reconstitution of a Partnership",
            "Dissolution of Partnership", "Accounting for Share Capital",
            "Issue of Debentures", "Financial Statement Analysis",
            "Cash Flow Statement",
        ],
        (12, "business_studies") => &[
            "Nature and Significance of Management", "Principles of Management",
            "Business Environment", "Planning", "Organising", "Staffing",
            "Directing", "Controlling", "Financial Management", "Marketing",
        ],
        (12, "english") => &[
            "The Last Lesson", "Lost Spring", "Deep Water", "The Rattrap",
            "Indigo", "Poets and Pancakes", "A Thing of Beauty",
            "Notice Writing", "Report Writing",
        ],
        _ => return None,
    };
    Some(list)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn aliases_normalize() {
        assert_eq!(normalize("Maths"), Some("mathematics"));
        assert_eq!(normalize("bio"), Some("biology"));
        assert_eq!(normalize("business"), Some("business_studies"));
        assert_eq!(normalize("PHYSICS"), Some("physics"));
        assert_eq!(normalize("history"), None);
    }

    #[test]
    fn every_subject_has_chapters_for_both_classes() {
        for subject in SUBJECTS {
            assert!(chapters(11, subject).is_some(), "missing 11/{subject}");
            assert!(chapters(12, subject).is_some(), "missing 12/{subject}");
        }
        assert!(chapters(10, "physics").is_none());
    }

    #[test]
    fn display_names_read_well() {
        assert_eq!(display_name("business_studies"), "Business Studies");
        assert_eq!(display_name("physics"), "Physics");
    }
}
