use super::state::Email;

/// Who the triage works for.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Persona {
    pub username: String,
    /// Completes the sentence "<username> ...".
    pub profile: String,
}

impl Persona {
    pub fn new(username: impl Into<String>, profile: impl Into<String>) -> Self {
        Self {
            username: username.into(),
            profile: profile.into(),
        }
    }

    pub fn title(&self) -> String {
        format!(
            "As Spam checker, you need to analyze emails and determine if they are spam or \
             legitimate, and whether they require the user's attention.\n{} {}\n",
            self.username, self.profile
        )
    }
}

const DRAFT_INSTRUCTION: &str = "As Spam checker, draft a preliminary response to this email.";

fn email_block(email: &Email) -> String {
    format!(
        "Email:\nFrom: {}\nSubject: {}\nBody: {}",
        email.sender, email.subject, email.body
    )
}

pub fn classification_prompt(persona: &Persona, email: &Email) -> String {
    format!(
        "{title}\n\
{email}\n\n\
Analyze the body of the email for:\n\
- Poor grammar and spelling errors.\n\
- Excessive use of links to unknown or suspicious domains.\n\
- Keywords commonly used in spam, such as \"free,\" \"money,\" \"urgent,\" etc.\n\
- Check for phishing attempts, such as requests for sensitive information (passwords, bank details).\n\n\
First, determine if this email is spam. If it is spam, explain why.\n\
If it is legitimate, categorize it (inquiry, complaint, thank you, request, information, etc.).\n\n\
I expect the result using the following format:\n\
type: spam or not spam\n\
category: inquiry, complaint, thank you, request, information or None if is spam\n\
reason: explanation of the decision why is spam or not spam\n",
        title = persona.title(),
        email = email_block(email),
    )
}

pub fn draft_prompt(persona: &Persona, email: &Email, category: &str) -> String {
    format!(
        "{instruction}\n\n\
{email}\n\n\
This email has been categorized as: {category}\n\n\
Draft a brief, professional response that {username} can review and personalize before sending.\n",
        instruction = DRAFT_INSTRUCTION,
        email = email_block(email),
        category = category,
        username = persona.username,
    )
}

/// A friendly catch-up mail addressed to `username`, used when no email is
/// given on the command line.
pub fn example_email(username: &str) -> Email {
    Email::new(
        "robert@gmail.com",
        "Catching up after all these times",
        format!(
            "Hi {u},\n\
I hope this email finds you well! It feels like ages since we last connected, and I was \
reminiscing about the good old times when we'd share laughs over a beer.\n\
How have things been going for you? I'd love to hear about what's new in your life, work, or \
anything exciting that you've been up to.\n\
If you're free sometime soon, it'd be amazing to meet up and relive some of those \
unforgettable moments. Let's plan a time to catch up, beers on me, like old times!\n\
Looking forward to hearing from you, {u}. Take care and hope to see you soon!\n\
Best regards, Robert\n",
            u = username
        ),
    )
}
