// All LLM prompt constants and fixed candidate-facing messages for screening.
// Reuses cross-cutting fragments from llm_client::prompts.

/// Opening message shown when a session is created, before any model call.
pub const GREETING_MESSAGE: &str = "Hello! I am **TalentScout Hiring Assistant**. \
    I'll guide you through our initial screening. \
    Please provide your **Full Name** to begin.";

/// Closing message for exit words and for the end of the question queue.
pub const CLOSING_MESSAGE: &str = "Thank you for completing the initial screening with \
    TalentScout Hiring Assistant. Your information has been securely recorded. \
    Goodbye and good luck!";

pub const GENERATION_FAILED_MESSAGE: &str =
    "I apologize, question generation failed. Ending conversation.";

pub const NOT_UNDERSTOOD_MESSAGE: &str = "I did not understand. Can you please repeat?";

/// The gathering prompt tells the model to say this once the tech stack is collected.
/// Matched case-insensitively against the last assistant turn.
pub const ASSESSMENT_MARKER: &str = "technical assessment stage";

/// Token the candidate types to confirm the tech stack.
pub const CONFIRM_TOKEN: &str = "next";

/// Fixed exit words, compared case-insensitively against the whole input.
pub const EXIT_WORDS: [&str; 4] = ["quit", "bye", "exit", "end"];

/// System instruction for the information-gathering conversation.
pub const INFO_GATHERING_SYSTEM: &str = r#"**ROLE**: You are "TalentScout Hiring Assistant," an intelligent, professional, and friendly chatbot.
**GOAL**: Conduct the initial screening by gathering essential information from the candidate: full name, email address, phone number, years of experience, desired position(s), current location, and tech stack.

--- INSTRUCTION ---
1.  **Sequential Gathering**: Ask for **ONE** piece of information at a time. Start with the **Full Name**.
2.  **Confirmation and Transition**: Once you believe you have collected the entire **Tech Stack**, you must conclude with this specific phrase: "Thank you for providing your details. We are now moving to the **Technical Assessment Stage**. Your tech stack is: [list tech stack]. Please type 'NEXT' to confirm this is correct and proceed, or update your tech stack now."
3.  **Exit Handling**: If the candidate types "quit," "bye," "exit," or "end," conclude the conversation gracefully."#;

/// Tech stack extraction prompt. Replace `{history}` before sending.
pub const TECH_STACK_EXTRACTION_PROMPT: &str = r#"Analyze the following conversation history and extract ONLY the list of key technologies, frameworks, languages, databases, and tools the candidate declared they are proficient in.
Return the result as a comma-separated list of technologies.

Conversation History:
{history}"#;

/// Assessment generation prompt. Replace `{tech_stack}` before sending.
pub const TECH_QUESTIONS_PROMPT_TEMPLATE: &str = r#"**ROLE**: You are "TalentScout Tech Assessor," a highly skilled technical interviewer.
**GOAL**: Generate 3 to 5 challenging, relevant, and concise technical screening questions for each technology listed in the provided Tech Stack.

--- INPUT DATA ---
Candidate's Tech Stack: {tech_stack}

--- INSTRUCTION ---
1.  **Constraint**: You MUST generate exactly **3 to 5 questions** for **EACH** technology item listed.
2.  **Format**: You MUST output a single JSON object that strictly adheres to the provided output schema.

--- OUTPUT SCHEMA ---
Return a JSON object with this EXACT schema (no extra fields):
{
  "assessment": {
    "Python": [
      {"question": "How does the GIL affect multi-threaded CPU-bound code?"},
      {"question": "Explain the difference between a list and a tuple."},
      {"question": "What are generators and when would you use one?"}
    ]
  }
}
Keys are the technologies exactly as listed; values are lists of 3-5 question objects."#;
