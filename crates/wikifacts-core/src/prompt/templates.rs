//! Fixed English templates. Everything localized or stripped at runtime
//! starts from these strings.

pub(crate) const SYSTEM_BASE: &str = "You are solving a factual verification task.\n\
You will be given a factual statement{context_clause}.\n\
{instruction}\n\
Decide whether the statement is true or false, or whether there is not enough information to decide.\n\
Respond only with a JSON object of the form {\"answer\": \"yes\" | \"no\" | \"idk\", \"reasoning\": \"<short explanation>\"}.\n\
Use \"yes\" if the statement is true and \"no\" if it is false; use \"idk\" if you don't know.\n\
Write the reasoning in the same language as the statement.";

pub(crate) const USER_FACT: &str = "Statement: \"{fact}\"\n\n\
Is the statement factually correct? Answer \"yes\" or \"no\", or \"idk\" if you don't know.";

pub(crate) const USER_CONTEXT: &str = "Context:\n{context}\n\n\
Statement: \"{fact}\"\n\n\
Is the statement factually correct according to the context? Answer \"yes\" or \"no\", or \"idk\" if you don't know.";

pub(crate) const CONTEXT_CLAUSE_LINKED: &str = " together with the Wikipedia articles linked from it";
pub(crate) const CONTEXT_CLAUSE_RELEVANT: &str =
    " together with passages from Wikipedia articles relevant to it";

pub(crate) const INSTRUCTION_FACT: &str = "Verify the statement using only your own knowledge.";
pub(crate) const INSTRUCTION_LINKED: &str =
    "Verify the statement using the linked articles provided as context.";
pub(crate) const INSTRUCTION_RELEVANT: &str =
    "Verify the statement using the relevant passages provided as context.";

/// Substrings that offer the "don't know" outcome. Removing all of them
/// leaves grammatical yes/no instructions.
pub(crate) const IDK_FRAGMENTS: &[&str] = &[
    ", or whether there is not enough information to decide",
    " | \"idk\"",
    "; use \"idk\" if you don't know",
    ", or \"idk\" if you don't know",
];

pub(crate) struct FewShotExample {
    pub fact: &'static str,
    pub context: &'static str,
    pub answer: crate::model::Answer,
    pub reasoning: &'static str,
}

pub(crate) const FEW_SHOTS: [FewShotExample; 2] = [
    FewShotExample {
        fact: "The Eiffel Tower is located in Paris.",
        context: "The Eiffel Tower is a wrought-iron lattice tower on the Champ de Mars in Paris, France.",
        answer: crate::model::Answer::Yes,
        reasoning: "The Eiffel Tower stands on the Champ de Mars in Paris, so the statement is true.",
    },
    FewShotExample {
        fact: "The Amazon River flows into the Pacific Ocean.",
        context: "The Amazon River in South America flows eastward and empties into the Atlantic Ocean.",
        answer: crate::model::Answer::No,
        reasoning: "The Amazon empties into the Atlantic Ocean, not the Pacific, so the statement is false.",
    },
];
