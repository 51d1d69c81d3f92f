//! Seed content: interview question bank and debate topics

use serde::{Deserialize, Serialize};

/// Questions asked regardless of airline
const COMMON_QUESTIONS: &[&str] = &[
    "Please introduce yourself briefly.",
    "Why do you want to become a flight attendant?",
    "How would you handle an upset passenger?",
    "Describe a time you worked as part of a team under pressure.",
    "What does great in-flight service mean to you?",
    "How do you take care of your health and stamina for irregular schedules?",
    "Tell us about a time you went out of your way to help someone.",
    "How would you respond if a colleague made a mistake during service?",
];

/// Per-airline flavor questions keyed by a lowercase airline slug
const AIRLINE_QUESTIONS: &[(&str, &[&str])] = &[
    (
        "korean_air",
        &[
            "Why Korean Air rather than another carrier?",
            "What do you know about Korean Air's service philosophy?",
            "How would you represent Korean Air's image to international passengers?",
        ],
    ),
    (
        "asiana",
        &[
            "What attracts you to Asiana Airlines?",
            "How would you deliver Asiana's standard of personal attention in a full cabin?",
        ],
    ),
    (
        "jeju_air",
        &[
            "How does service differ on a low-cost carrier, and how would you excel at it?",
            "Why is Jeju Air the right fit for your personality?",
        ],
    ),
];

/// Pick `count` questions for an airline: airline-specific first, then
/// common questions to fill. Unknown airlines get the common set.
pub fn airline_questions(airline: &str, count: usize) -> Vec<String> {
    let slug = airline.trim().to_lowercase().replace(' ', "_");
    let specific = AIRLINE_QUESTIONS
        .iter()
        .find(|(key, _)| *key == slug)
        .map(|(_, qs)| *qs)
        .unwrap_or(&[]);

    specific
        .iter()
        .chain(COMMON_QUESTIONS.iter())
        .take(count)
        .map(|q| q.to_string())
        .collect()
}

/// A pre-built pro/con debate topic
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DebateTopic {
    pub id: String,
    pub topic: String,
    pub description: String,
    pub pro_points: Vec<String>,
    pub con_points: Vec<String>,
}

fn built_in_topics() -> Vec<DebateTopic> {
    let raw: &[(&str, &str, &str, &[&str], &[&str])] = &[
        (
            "device_policy",
            "Relaxing in-flight electronic device restrictions",
            "Debate loosening the device policy during takeoff and landing.",
            &["Devices are daily essentials", "Modern avionics tolerate them", "Better passenger convenience"],
            &["Safety comes first", "Distracts from crew instructions", "Slower emergency response"],
        ),
        (
            "alcohol_service",
            "Limiting in-flight alcohol sales",
            "Debate restricting alcohol service to prevent onboard incidents.",
            &["Prevents disruptive passengers", "Safer cabin environment", "Lighter crew workload"],
            &["Adults can choose for themselves", "Cuts premium service", "Lost revenue"],
        ),
        (
            "uniform_freedom",
            "Relaxing cabin crew uniform requirements",
            "Debate loosening the mandatory uniform policy for crew.",
            &["Personal expression", "More comfortable shifts", "Reflects changing times"],
            &["Brand consistency", "Projects professionalism", "Passengers identify crew easily"],
        ),
        (
            "child_free_zone",
            "Designating child-free cabin zones",
            "Debate restricting children from certain cabin sections.",
            &["Quieter flights", "Considerate to business travelers", "More customer choice"],
            &["Discriminates against families", "Children's rights", "Hurts the airline's image"],
        ),
        (
            "pet_cabin",
            "Expanding pets-in-cabin allowances",
            "Debate letting more companion animals travel in the cabin.",
            &["Animal welfare", "Pet ownership keeps growing", "Cargo holds stress animals"],
            &["Allergic passengers", "Noise", "Hygiene is hard to manage"],
        ),
    ];

    raw.iter()
        .map(|(id, topic, description, pro, con)| DebateTopic {
            id: id.to_string(),
            topic: topic.to_string(),
            description: description.to_string(),
            pro_points: pro.iter().map(|s| s.to_string()).collect(),
            con_points: con.iter().map(|s| s.to_string()).collect(),
        })
        .collect()
}

/// Resolve a debate topic by id or title; anything else becomes a
/// custom topic with no prepared talking points.
pub fn resolve_topic(topic: &str) -> DebateTopic {
    built_in_topics()
        .into_iter()
        .find(|t| t.id == topic || t.topic == topic)
        .unwrap_or_else(|| DebateTopic {
            id: "custom".to_string(),
            topic: topic.to_string(),
            description: "Custom debate topic".to_string(),
            pro_points: Vec::new(),
            con_points: Vec::new(),
        })
}

/// Every prepared topic, for listing in a picker
pub fn debate_topics() -> Vec<DebateTopic> {
    built_in_topics()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn airline_specific_questions_come_first() {
        let qs = airline_questions("Korean Air", 5);
        assert_eq!(qs.len(), 5);
        assert!(qs[0].contains("Korean Air"));
    }

    #[test]
    fn unknown_airline_falls_back_to_common_set() {
        let qs = airline_questions("nonexistent", 3);
        assert_eq!(qs[0], COMMON_QUESTIONS[0]);
    }

    #[test]
    fn unknown_topic_becomes_custom() {
        let known = resolve_topic("pet_cabin");
        assert!(!known.pro_points.is_empty());

        let custom = resolve_topic("Should galley snacks be free?");
        assert_eq!(custom.id, "custom");
        assert!(custom.pro_points.is_empty());
    }
}
