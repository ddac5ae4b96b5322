//! Static question bank, tried before the AI adapter.

pub struct BankQuestion {
    pub subject: &'static str,
    pub class_level: u8,
    /// Lowercase topic tag; matched by substring against a requested topic.
    pub topic: &'static str,
    pub question: &'static str,
    pub options: [&'static str; 4],
    pub correct_answer: char,
    pub explanation: &'static str,
}

/// Questions matching the request, bank order. An unknown topic yields the
/// subject's whole list so the provider can still serve something.
pub fn stored_questions(
    subject: &str,
    class_level: u8,
    topic: Option<&str>,
) -> Vec<&'static BankQuestion> {
    let by_subject: Vec<&BankQuestion> = BANK
        .iter()
        .filter(|q| q.subject == subject && q.class_level == class_level)
        .collect();

    if let Some(topic) = topic {
        let topical: Vec<&BankQuestion> = by_subject
            .iter()
            .copied()
            .filter(|q| q.topic.contains(&topic.to_lowercase()))
            .collect();
        if !topical.is_empty() {
            return topical;
        }
    }
    by_subject
}

static BANK: &[BankQuestion] = &[
    BankQuestion {
        subject: "physics",
        class_level: 11,
        topic: "waves",
        question: "A wave travels along a stretched string at 40 m/s with a frequency of 80 Hz. What is its wavelength?",
        options: ["A) 0.5 m", "B) 2 m", "C) 3200 m", "D) 0.25 m"],
        correct_answer: 'A',
        explanation: "Wavelength = speed / frequency = 40 / 80 = 0.5 m.",
    },
    BankQuestion {
        subject: "physics",
        class_level: 11,
        topic: "laws of motion",
        question: "A net force of 10 N acts on a 2 kg body at rest. Its acceleration is:",
        options: ["A) 0.2 m/s²", "B) 5 m/s²", "C) 12 m/s²", "D) 20 m/s²"],
        correct_answer: 'B',
        explanation: "From F = ma, a = F/m = 10/2 = 5 m/s².",
    },
    BankQuestion {
        subject: "physics",
        class_level: 12,
        topic: "current electricity",
        question: "Two 4 Ω resistors are connected in parallel. The equivalent resistance is:",
        options: ["A) 8 Ω", "B) 4 Ω", "C) 2 Ω", "D) 1 Ω"],
        correct_answer: 'C',
        explanation: "For equal resistors in parallel, R_eq = R/2 = 2 Ω.",
    },
    BankQuestion {
        subject: "chemistry",
        class_level: 11,
        topic: "structure of atom",
        question: "The maximum number of electrons in the n = 3 shell is:",
        options: ["A) 8", "B) 18", "C) 32", "D) 2"],
        correct_answer: 'B',
        explanation: "Capacity is 2n² = 2 × 9 = 18 electrons.",
    },
    BankQuestion {
        subject: "chemistry",
        class_level: 12,
        topic: "electrochemistry",
        question: "In an electrochemical cell, oxidation always occurs at the:",
        options: ["A) Cathode", "B) Anode", "C) Salt bridge", "D) Electrolyte"],
        correct_answer: 'B',
        explanation: "By definition the anode is the electrode where oxidation happens.",
    },
    BankQuestion {
        subject: "mathematics",
        class_level: 11,
        topic: "sets",
        question: "If A = {1, 2, 3} and B = {2, 3, 4}, then A ∩ B equals:",
        options: ["A) {1, 4}", "B) {1, 2, 3, 4}", "C) {2, 3}", "D) ∅"],
        correct_answer: 'C',
        explanation: "The intersection keeps the elements common to both sets: 2 and 3.",
    },
    BankQuestion {
        subject: "mathematics",
        class_level: 12,
        topic: "integrals",
        question: "∫ 2x dx equals:",
        options: ["A) x² + C", "B) 2x² + C", "C) x²/2 + C", "D) 2 + C"],
        correct_answer: 'A',
        explanation: "The antiderivative of 2x is x², plus the constant of integration.",
    },
    BankQuestion {
        subject: "biology",
        class_level: 11,
        topic: "cell",
        question: "Which organelle is known as the powerhouse of the cell?",
        options: ["A) Ribosome", "B) Nucleus", "C) Mitochondrion", "D) Golgi apparatus"],
        correct_answer: 'C',
        explanation: "Mitochondria generate most of the cell's ATP through respiration.",
    },
    BankQuestion {
        subject: "biology",
        class_level: 12,
        topic: "inheritance",
        question: "In a monohybrid cross of two heterozygotes, the phenotypic ratio is:",
        options: ["A) 1:1", "B) 3:1", "C) 9:3:3:1", "D) 1:2:1"],
        correct_answer: 'B',
        explanation: "Aa × Aa gives 3 dominant-phenotype offspring for every recessive one.",
    },
    BankQuestion {
        subject: "economics",
        class_level: 12,
        topic: "national income",
        question: "GDP at market price minus net indirect taxes equals:",
        options: ["A) NNP", "B) GNP", "C) GDP at factor cost", "D) Personal income"],
        correct_answer: 'C',
        explanation: "Removing net indirect taxes from market-price GDP yields factor cost.",
    },
    BankQuestion {
        subject: "accountancy",
        class_level: 11,
        topic: "introduction",
        question: "Which of these is a liability for a business?",
        options: ["A) Debtors", "B) Cash in hand", "C) Creditors", "D) Machinery"],
        correct_answer: 'C',
        explanation: "Creditors are amounts the business owes to outsiders.",
    },
    BankQuestion {
        subject: "business_studies",
        class_level: 12,
        topic: "management",
        question: "\"Management is what a manager does\" emphasises management as a:",
        options: ["A) Science", "B) Process", "C) Commodity", "D) Structure"],
        correct_answer: 'B',
        explanation: "The statement describes management through its ongoing activities.",
    },
    BankQuestion {
        subject: "english",
        class_level: 11,
        topic: "grammar",
        question: "Choose the correctly punctuated sentence:",
        options: [
            "A) Its raining outside.",
            "B) It's raining outside.",
            "C) Its' raining outside.",
            "D) Its raining, outside.",
        ],
        correct_answer: 'B',
        explanation: "\"It's\" is the contraction of \"it is\".",
    },
];

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn topic_filter_narrows_results() {
        let all = stored_questions("physics", 11, None);
        assert!(all.len() >= 2);
        let waves = stored_questions("physics", 11, Some("waves"));
        assert_eq!(waves.len(), 1);
        assert!(waves[0].question.contains("wavelength"));
    }

    #[test]
    fn unknown_topic_falls_back_to_subject() {
        let qs = stored_questions("physics", 11, Some("quantum"));
        assert_eq!(qs.len(), stored_questions("physics", 11, None).len());
    }

    #[test]
    fn answers_are_valid_letters() {
        for q in BANK {
            assert!(('A'..='D').contains(&q.correct_answer), "{}", q.question);
            assert_eq!(q.options.len(), 4);
        }
    }
}
