//! Static term tables used by the keyword extractor

/// Direction of an abnormal lab value
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum Direction {
    Low,
    High,
}

impl Direction {
    pub(crate) fn words(self) -> &'static str {
        match self {
            Direction::Low => "low|decreased|reduced|below|deficient",
            Direction::High => "high|elevated|increased|above|raised",
        }
    }
}

/// A lab marker, the direction it deviates in, and the concept that implies
pub(crate) struct FindingRule {
    pub marker: &'static str,
    pub direction: Direction,
    pub concept: &'static str,
}

const HEMOGLOBIN: &str = "hemoglobin|haemoglobin|hgb|hb";
const MCV: &str = "mcv|mean corpuscular volume";
const GLUCOSE: &str = "fasting glucose|blood glucose|blood sugar|glucose";
const HBA1C: &str = "hba1c|hemoglobin a1c|glycated hemoglobin|a1c";
const LIPIDS: &str = "ldl cholesterol|total cholesterol|cholesterol|ldl";
const TSH: &str = "tsh|thyroid stimulating hormone";
const CREATININE: &str = "creatinine";
const WBC: &str = "white blood cells?|white cell count|wbc|leukocytes?";
const PLATELETS: &str = "platelet count|platelets?|plt";
const POTASSIUM: &str = "potassium";
const SODIUM: &str = "sodium";
const FERRITIN: &str = "ferritin";
const B12: &str = "vitamin b12|cobalamin|b12";
const VITAMIN_D: &str = "25-oh vitamin d|vitamin d|vit d";
const LIVER_ENZYMES: &str = "liver enzymes|transaminases|alt|ast";
const BLOOD_PRESSURE: &str = "blood pressure|bp";

pub(crate) const FINDING_RULES: &[FindingRule] = &[
    FindingRule { marker: HEMOGLOBIN, direction: Direction::Low, concept: "anemia" },
    FindingRule { marker: MCV, direction: Direction::High, concept: "macrocytic anemia" },
    FindingRule { marker: MCV, direction: Direction::Low, concept: "microcytic anemia" },
    FindingRule { marker: GLUCOSE, direction: Direction::High, concept: "hyperglycemia" },
    FindingRule { marker: GLUCOSE, direction: Direction::Low, concept: "hypoglycemia" },
    FindingRule { marker: HBA1C, direction: Direction::High, concept: "diabetes" },
    FindingRule { marker: LIPIDS, direction: Direction::High, concept: "hypercholesterolemia" },
    FindingRule { marker: TSH, direction: Direction::High, concept: "hypothyroidism" },
    FindingRule { marker: TSH, direction: Direction::Low, concept: "hyperthyroidism" },
    FindingRule { marker: CREATININE, direction: Direction::High, concept: "chronic kidney disease" },
    FindingRule { marker: WBC, direction: Direction::High, concept: "leukocytosis" },
    FindingRule { marker: WBC, direction: Direction::Low, concept: "leukopenia" },
    FindingRule { marker: PLATELETS, direction: Direction::Low, concept: "thrombocytopenia" },
    FindingRule { marker: POTASSIUM, direction: Direction::High, concept: "hyperkalemia" },
    FindingRule { marker: POTASSIUM, direction: Direction::Low, concept: "hypokalemia" },
    FindingRule { marker: SODIUM, direction: Direction::Low, concept: "hyponatremia" },
    FindingRule { marker: FERRITIN, direction: Direction::Low, concept: "iron deficiency" },
    FindingRule { marker: B12, direction: Direction::Low, concept: "vitamin b12 deficiency" },
    FindingRule { marker: VITAMIN_D, direction: Direction::Low, concept: "vitamin d deficiency" },
    FindingRule { marker: LIVER_ENZYMES, direction: Direction::High, concept: "elevated liver enzymes" },
    FindingRule { marker: BLOOD_PRESSURE, direction: Direction::High, concept: "hypertension" },
];

/// Conditions and symptoms matched verbatim
pub(crate) const CONDITIONS: &[&str] = &[
    "type 1 diabetes",
    "type 2 diabetes",
    "diabetes",
    "hypertension",
    "asthma",
    "copd",
    "chest pain",
    "shortness of breath",
    "difficulty breathing",
    "palpitations",
    "headache",
    "migraine",
    "fever",
    "cough",
    "fatigue",
    "dizziness",
    "nausea",
    "vomiting",
    "diarrhea",
    "abdominal pain",
    "back pain",
    "joint pain",
    "rash",
    "anemia",
    "pneumonia",
    "influenza",
    "covid-19",
    "sore throat",
    "urinary tract infection",
    "kidney stones",
    "heart failure",
    "atrial fibrillation",
    "stroke",
    "arthritis",
    "osteoporosis",
    "hypothyroidism",
    "hyperthyroidism",
    "chronic kidney disease",
    "depression",
    "anxiety",
    "insomnia",
    "obesity",
];

/// Biomarkers matched verbatim
pub(crate) const BIOMARKERS: &[&str] = &[
    "hemoglobin",
    "hba1c",
    "troponin",
    "creatinine",
    "cholesterol",
    "ldl",
    "hdl",
    "triglycerides",
    "tsh",
    "glucose",
    "ferritin",
    "platelets",
    "potassium",
    "sodium",
    "psa",
    "crp",
    "mcv",
    "wbc",
    "bnp",
    "d-dimer",
    "inr",
    "vitamin d",
    "vitamin b12",
];

pub(crate) const MALE_WORDS: &str = "male|man|boy|gentleman";
pub(crate) const FEMALE_WORDS: &str = "female|woman|girl|lady|pregnant";

/// Words skipped by the longest-word fallback
pub(crate) const STOPWORDS: &[&str] = &[
    "all", "and", "any", "are", "but", "can", "did", "for", "had", "has", "her", "him", "his",
    "how", "its", "may", "not", "now", "our", "she", "the", "too", "was", "who", "why", "you",
    "about", "after", "again", "also", "been", "before", "being", "could", "does", "doing",
    "down", "during", "each", "from", "further", "have", "having", "here", "into", "just",
    "more", "most", "much", "myself", "only", "other", "over", "past", "please", "really",
    "same", "should", "some", "such", "than", "that", "their", "them", "then", "there",
    "these", "they", "this", "those", "through", "under", "until", "very", "want", "were",
    "what", "when", "where", "which", "while", "with", "would", "your", "yours", "experiencing",
    "feel", "feeling", "know", "tell", "thing", "things", "since", "days", "weeks",
];
