// src/job_analysis/prompts.rs
//! Prompt builders for the scoring, requirement analysis and cover letter calls

use super::CoverLetterRequest;
use crate::utils::truncate_chars;

/// Cover letters only see the head of long descriptions
pub const COVER_LETTER_DESCRIPTION_CHARS: usize = 3000;

const JSON_ONLY: &str = "Respond with ONLY the JSON.";

const SCORING_INSTRUCTIONS: &str = "You are a precise job-match evaluator. Given a resume and a job description, \
return a JSON with fields: score (0-100 integer), strengths (short list), gaps (short list), \
and summary (2-3 sentences). Focus on skills, experience, domain, seniority, and tech stack alignment.";

const GUIDE_INSTRUCTIONS: &str = "Your primary task is to score the job based on my core skills. \
However, you must use the PERSONAL SCORING GUIDELINES provided above to adjust the final score and the reason. \
These are my personal priorities.";

pub fn scoring_prompt(resume_text: &str, job_description: &str, scoring_guide: Option<&str>) -> String {
    let mut prompt = String::with_capacity(resume_text.len() + job_description.len() + 1024);
    prompt.push_str(SCORING_INSTRUCTIONS);
    prompt.push_str("\n\n");

    let guide = scoring_guide.map(str::trim).filter(|g| !g.is_empty());
    if let Some(guide) = guide {
        prompt.push_str("--- PERSONAL SCORING GUIDELINES ---\n");
        prompt.push_str(guide);
        prompt.push_str("\n--- END OF GUIDELINES ---\n\n");
    }

    prompt.push_str(&format!("Resume:\n{}\n\n", resume_text));
    prompt.push_str(&format!("Job Description:\n{}\n\n", job_description));

    if guide.is_some() {
        prompt.push_str(GUIDE_INSTRUCTIONS);
        prompt.push_str("\n\n");
    }

    prompt.push_str(JSON_ONLY);
    prompt
}

pub fn requirements_prompt(requirements: &[String], core_skills: &[String]) -> String {
    let numbered: Vec<String> = requirements
        .iter()
        .enumerate()
        .map(|(i, req)| format!("{}. {}", i + 1, req))
        .collect();

    format!(
        r#"You are an expert HR analyst. Analyze each job requirement against these core skills: {skills}

Job Requirements:
{requirements}

For each requirement, provide:
1. A Match Score from 1 (irrelevant) to 10 (perfect match) based on semantic alignment with the core skills
2. A brief reason explaining the score (e.g., "High score: Directly mentions Python and data analysis" or "Low score: Focuses on non-relevant marketing skills")

Return ONLY a JSON array where each element has:
- "requirement": the original requirement text
- "score": integer from 1-10
- "reason": short explanation sentence

Example format:
[
  {{"requirement": "Experience with Python programming", "score": 9, "reason": "High score: Directly mentions Python which is a core skill"}},
  {{"requirement": "Marketing experience required", "score": 2, "reason": "Low score: Focuses on marketing, not relevant to technical skills"}}
]

Respond with ONLY the JSON array, no additional text."#,
        skills = core_skills.join(", "),
        requirements = numbered.join("\n"),
    )
}

/// The letter header and contact footer are added when the file is written,
/// so the model only produces salutation, body and closing.
pub fn cover_letter_prompt(request: &CoverLetterRequest<'_>) -> String {
    let skills = if request.skills.is_empty() {
        "None specified".to_string()
    } else {
        request.skills.join(", ")
    };
    let location = if request.location.trim().is_empty() {
        "Not specified"
    } else {
        request.location
    };

    format!(
        r#"You are a professional cover letter writer. Write a personalized cover letter for the following job application.

Job Title: {title}
Company: {company}
Location: {location}

Job Description:
{description}

Candidate Resume:
{resume}

Candidate Skills (ONLY mention these - do not invent skills):
{skills}

STRICT INSTRUCTIONS - FOLLOW EXACTLY:

1. LENGTH:
   - The cover letter body must be EXACTLY TWO PARAGRAPHS.
   - Be concise. Every sentence must add value.

2. TONE - MATTER-OF-FACT AND PROFESSIONAL:
   - Use a direct, professional tone.
   - DO NOT USE: "thrilled", "excited", "passionate", "eager", "enthusiastic", "dream job", "perfect fit", "perfect candidate", or exclamation marks.
   - Prefer phrasing such as "I am writing regarding the {title} position...", "My experience includes...", "My background in [skill] aligns with your requirements...".

3. ACCURACY - NO INVENTED SKILLS:
   - ONLY mention skills listed in "Candidate Skills" above or explicitly evident in the resume.
   - If the job requires a skill the candidate does not list, do not mention it and do not apologize for it.

4. SELF-LEARNING (SECOND PARAGRAPH):
   - The second paragraph MUST state the candidate's proven ability to learn new technologies quickly, framed as the way to bridge any gap in specific tool requirements.

STRUCTURE:
- Salutation (Dear Hiring Manager,)
- FIRST PARAGRAPH: direct statement of interest and key qualifications matching the job
- SECOND PARAGRAPH: self-learning ability and adaptability
- Closing (Sincerely,) followed by {name}

Do not include a date, address block or contact details.
Write ONLY the cover letter, no additional commentary."#,
        title = request.job_title,
        company = request.company,
        location = location,
        description = truncate_chars(request.job_description, COVER_LETTER_DESCRIPTION_CHARS),
        resume = request.resume_text,
        skills = skills,
        name = request.candidate_name,
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_scoring_prompt_without_guide() {
        let prompt = scoring_prompt("RESUME", "DESCRIPTION", None);
        assert!(prompt.contains("Resume:\nRESUME"));
        assert!(prompt.contains("Job Description:\nDESCRIPTION"));
        assert!(!prompt.contains("PERSONAL SCORING GUIDELINES"));
        assert!(prompt.ends_with(JSON_ONLY));
    }

    #[test]
    fn test_scoring_prompt_embeds_guide_before_resume() {
        let prompt = scoring_prompt("RESUME", "DESCRIPTION", Some("PENALIZE: on-site only\n"));
        let guide_at = prompt.find("PENALIZE: on-site only").unwrap();
        let resume_at = prompt.find("Resume:").unwrap();
        assert!(guide_at < resume_at);
        assert!(prompt.contains(GUIDE_INSTRUCTIONS));
    }

    #[test]
    fn test_blank_guide_is_ignored() {
        let prompt = scoring_prompt("R", "D", Some("   \n"));
        assert!(!prompt.contains("PERSONAL SCORING GUIDELINES"));
    }

    #[test]
    fn test_requirements_prompt_numbers_items() {
        let prompt = requirements_prompt(
            &["Python".to_string(), "SQL".to_string()],
            &["Python".to_string(), "Data Analysis".to_string()],
        );
        assert!(prompt.contains("core skills: Python, Data Analysis"));
        assert!(prompt.contains("1. Python\n2. SQL"));
    }

    #[test]
    fn test_cover_letter_prompt_truncates_description() {
        let description = "x".repeat(COVER_LETTER_DESCRIPTION_CHARS + 500);
        let request = CoverLetterRequest {
            resume_text: "resume",
            candidate_name: "Jane Doe",
            job_title: "Data Engineer",
            company: "Acme",
            job_description: &description,
            location: "",
            skills: &[],
        };
        let prompt = cover_letter_prompt(&request);

        assert!(prompt.contains(&"x".repeat(COVER_LETTER_DESCRIPTION_CHARS)));
        assert!(!prompt.contains(&"x".repeat(COVER_LETTER_DESCRIPTION_CHARS + 1)));
        assert!(prompt.contains("Location: Not specified"));
        assert!(prompt.contains("None specified"));
        assert!(prompt.contains("followed by Jane Doe"));
    }
}
