//! Prompt construction for the three clinical modules.
//!
//! Every completion the application requests is built here: the fixed
//! analysis prompts (`TRAUMA_ANALYSIS`, `TRANSCRIPTION`,
//! `PRESCRIPTION_READING`) and the parameterised builders for summaries and
//! translations.  Each prompt that expects structured output spells out the
//! exact JSON shape and instructs the model to respond with JSON only; the
//! parser still tolerates a stray markdown fence.
//!
//! Translation prompts address rural Indian patients and health workers, so
//! they ask for simple, colloquial phrasing rather than formal register.

use crate::lang::Language;
use crate::modules::scribe::MedicalSummary;
use crate::modules::triage::TraumaAssessment;

// ---------------------------------------------------------------------------
// Fixed analysis prompts
// ---------------------------------------------------------------------------

/// Trauma-image triage: strict JSON with severity scoring.
///
/// The severity guide and the `call_emergency` recommendation are part of the
/// prompt; the UI additionally applies its own emergency policy on the parsed
/// score (see `TraumaAssessment::requires_emergency`).
pub const TRAUMA_ANALYSIS: &str = r#"You are an emergency medical AI assistant analyzing a trauma image.

Analyze this injury image and provide a STRICT JSON response with the following structure:

{
  "severity_score": <number 1-10>,
  "severity_level": "<LOW|MEDIUM|HIGH>",
  "injury_type": "<description of injury type>",
  "immediate_actions": [
    "<step 1>",
    "<step 2>",
    "<step 3>"
  ],
  "call_emergency": <true|false>,
  "warning_signs": [
    "<sign 1>",
    "<sign 2>"
  ],
  "assessment": "<brief clinical assessment>"
}

CRITICAL: Respond ONLY with valid JSON. No markdown, no explanation, just the JSON object.

Severity Score Guide:
- 1-3: Minor injury (LOW) - bruises, small cuts
- 4-6: Moderate injury (MEDIUM) - deeper wounds, possible fractures
- 7-10: Severe injury (HIGH) - life-threatening, major trauma

Set call_emergency to true if severity >= 7 or life-threatening signs present."#;

/// Consultation-audio transcription with language detection.
pub const TRANSCRIPTION: &str = r#"Transcribe this audio recording accurately. Detect the language being spoken.

Return ONLY a JSON object with this structure:
{
  "transcript": "<full transcription in original language>",
  "language": "<detected language name>",
  "language_code": "<ISO language code like en-IN, hi-IN, ta-IN, etc>"
}

CRITICAL: Respond ONLY with valid JSON. No markdown, no explanation."#;

/// Prescription OCR: structured record with per-medication plain-language
/// instructions for later audio playback.
pub const PRESCRIPTION_READING: &str = r#"You are a prescription reading AI that performs OCR on handwritten medical prescriptions.

Analyze this prescription image and provide a STRICT JSON response with the following structure:

{
  "doctor_name": "<doctor's name if visible>",
  "date": "<prescription date if visible>",
  "patient_name": "<patient name if visible>",
  "medications": [
    {
      "medicine_name": "<medication name>",
      "dosage": "<dosage amount>",
      "frequency": "<how often to take>",
      "duration": "<how many days>",
      "instructions": "<special instructions>",
      "colloquial_instruction": "<simple language instruction for patient>"
    }
  ],
  "general_advice": "<any general medical advice>",
  "follow_up": "<follow-up instructions>"
}

CRITICAL: Respond ONLY with valid JSON. No markdown, no explanation, just the JSON object.

For colloquial_instruction, write simple, clear instructions in plain English that can be easily translated to audio.
Example: "Take one red pill every morning after breakfast with water""#;

// ---------------------------------------------------------------------------
// Medical summary
// ---------------------------------------------------------------------------

const MEDICAL_SUMMARY_SHAPE: &str = r#"Provide a STRICT JSON response with the following structure:

{
  "chief_complaint": "<main reason for visit>",
  "duration": "<how long has the problem existed>",
  "symptoms": "<detailed symptom description>",
  "medical_history": "<relevant past medical history mentioned>",
  "physical_exam": "<physical examination findings if mentioned>",
  "assessment": "<doctor's initial assessment or impression>",
  "treatment_plan": "<recommended medications, procedures, or treatments>",
  "follow_up": "<follow-up instructions and timeline>",
  "red_flags": "<warning signs patient should watch for>"
}

CRITICAL: Respond ONLY with valid JSON. No markdown, no explanation, just the JSON object.

Use professional medical terminology while remaining clear. This summary will be used by another doctor to understand the patient's case.
"#;

/// Clinical summary of a transcribed consultation.
///
/// `source_language` is the detected language *name* ("Hindi", not "hi-IN") —
/// it tells the model what language the transcript is in.
pub fn medical_summary(transcript: &str, source_language: &str) -> String {
    let mut prompt = String::with_capacity(1536);
    prompt.push_str(&format!(
        "You are a medical AI assistant analyzing a doctor-patient conversation transcript.\n\n\
         The conversation was in {source_language}. Generate a comprehensive clinical summary \
         suitable for doctor-to-doctor handoff.\n\n"
    ));
    prompt.push_str(MEDICAL_SUMMARY_SHAPE);
    prompt.push_str("\nConversation Transcript:\n");
    prompt.push_str(transcript);
    prompt
}

// ---------------------------------------------------------------------------
// Translations
// ---------------------------------------------------------------------------

const SUMMARY_TRANSLATION_SHAPE: &str = r#"

Provide the translated summary as JSON with the following structure:

{
  "chief_complaint": "<translated>",
  "duration": "<translated>",
  "symptoms": "<translated>",
  "medical_history": "<translated>",
  "physical_exam": "<translated>",
  "assessment": "<translated>",
  "treatment_plan": "<translated>",
  "follow_up": "<translated>",
  "red_flags": "<translated>"
}

CRITICAL: Respond ONLY with the translated JSON. No markdown, no explanation."#;

/// Whole-summary translation, preserving the JSON shape.
///
/// The response must keep the original English field names so the same
/// [`MedicalSummary`] decode applies to the translated record; only the
/// values change language.
pub fn summary_translation(summary: &MedicalSummary, target: Language) -> String {
    let original = serde_json::to_string_pretty(summary).unwrap_or_else(|_| "{}".into());

    let mut prompt = String::with_capacity(1024 + original.len());
    prompt.push_str(&format!(
        "Translate the following medical summary to {}.\n\n",
        target.display_name()
    ));
    prompt.push_str(
        "Maintain medical terminology accuracy and professional tone. Keep the JSON field \
         names exactly as given, in English; translate only the field values.\n\n",
    );
    prompt.push_str("Original Medical Summary (JSON):\n");
    prompt.push_str(&original);
    prompt.push_str(SUMMARY_TRANSLATION_SHAPE);
    prompt
}

/// Trauma assessment rendered as prose in the target language.
///
/// The output is free text meant to be read aloud (and fed to speech
/// synthesis), not re-parsed, so the assessment is flattened into labelled
/// lines before translation.
pub fn assessment_translation(assessment: &TraumaAssessment, target: Language) -> String {
    let name = target.display_name();

    let mut source = String::with_capacity(512);
    source.push_str(&format!(
        "Severity: {} out of 10 ({})\n",
        assessment.severity_score, assessment.severity_level
    ));
    source.push_str(&format!("Injury type: {}\n", assessment.injury_type));
    source.push_str(&format!("Assessment: {}\n", assessment.assessment));
    source.push_str("Immediate actions:\n");
    for action in &assessment.immediate_actions {
        source.push_str(&format!("- {action}\n"));
    }
    if !assessment.warning_signs.is_empty() {
        source.push_str("Warning signs to watch for:\n");
        for sign in &assessment.warning_signs {
            source.push_str(&format!("- {sign}\n"));
        }
    }
    if assessment.call_emergency {
        source.push_str("Call emergency services immediately.\n");
    }

    format!(
        "Translate the following emergency first-aid assessment to {name}.\n\n\
         Use simple, clear {name} that a health worker can read aloud to the people \
         at the scene. Keep the severity number unchanged.\n\n\
         English text to translate:\n{source}\n\
         Respond ONLY with the translated text in {name}. No explanation, no extra text, \
         just the translation."
    )
}

/// Single medication instruction, translated colloquially.
///
/// The response is plain text — it goes straight to the medication row and to
/// speech synthesis.
pub fn instruction_translation(text: &str, target: Language) -> String {
    let name = target.display_name();
    format!(
        "Translate the following medical prescription instructions to {name}.\n\n\
         Use simple, colloquial language that a rural patient with limited literacy can \
         easily understand.\n\
         Use common everyday words, not formal medical terminology.\n\n\
         English text to translate:\n{text}\n\n\
         Respond ONLY with the translated text in {name}. No explanation, no extra text, \
         just the translation."
    )
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_assessment() -> TraumaAssessment {
        TraumaAssessment {
            severity_score: 6,
            severity_level: "MEDIUM".into(),
            injury_type: "Deep laceration on left forearm".into(),
            immediate_actions: vec![
                "Apply direct pressure".into(),
                "Elevate the arm".into(),
            ],
            call_emergency: false,
            warning_signs: vec!["Spreading redness".into()],
            assessment: "Deep cut likely needing sutures.".into(),
        }
    }

    fn sample_summary() -> MedicalSummary {
        MedicalSummary {
            chief_complaint: "Fever and cough".into(),
            duration: "Three days".into(),
            symptoms: "High fever, dry cough, body ache".into(),
            medical_history: Some("Diabetic, on metformin".into()),
            physical_exam: None,
            assessment: "Likely viral upper respiratory infection".into(),
            treatment_plan: "Paracetamol 500mg TID, fluids, rest".into(),
            follow_up: "Return in 3 days if fever persists".into(),
            red_flags: None,
        }
    }

    // ---- fixed prompts ---

    #[test]
    fn trauma_prompt_spells_out_the_json_shape() {
        assert!(TRAUMA_ANALYSIS.contains("severity_score"));
        assert!(TRAUMA_ANALYSIS.contains("immediate_actions"));
        assert!(TRAUMA_ANALYSIS.contains("call_emergency"));
        assert!(TRAUMA_ANALYSIS.contains("STRICT JSON"));
    }

    #[test]
    fn trauma_prompt_recommends_emergency_at_seven() {
        assert!(TRAUMA_ANALYSIS.contains("severity >= 7"));
    }

    #[test]
    fn transcription_prompt_requests_language_detection() {
        assert!(TRANSCRIPTION.contains("transcript"));
        assert!(TRANSCRIPTION.contains("language_code"));
        assert!(TRANSCRIPTION.contains("Detect the language"));
    }

    #[test]
    fn prescription_prompt_requires_colloquial_instructions() {
        assert!(PRESCRIPTION_READING.contains("medications"));
        assert!(PRESCRIPTION_READING.contains("colloquial_instruction"));
        assert!(PRESCRIPTION_READING.contains("plain English"));
    }

    // ---- medical_summary ---

    #[test]
    fn summary_prompt_embeds_transcript_and_source_language() {
        let prompt = medical_summary("मुझे तीन दिन से बुखार है", "Hindi");
        assert!(prompt.contains("The conversation was in Hindi."));
        assert!(prompt.contains("मुझे तीन दिन से बुखार है"));
        assert!(prompt.contains("Conversation Transcript:"));
    }

    #[test]
    fn summary_prompt_lists_all_nine_sections() {
        let prompt = medical_summary("transcript", "English");
        for field in [
            "chief_complaint",
            "duration",
            "symptoms",
            "medical_history",
            "physical_exam",
            "assessment",
            "treatment_plan",
            "follow_up",
            "red_flags",
        ] {
            assert!(prompt.contains(field), "missing section {field}");
        }
    }

    // ---- summary_translation ---

    #[test]
    fn summary_translation_embeds_the_summary_json() {
        let prompt = summary_translation(&sample_summary(), Language::Hindi);
        assert!(prompt.contains("Translate the following medical summary to Hindi."));
        assert!(prompt.contains("Fever and cough"));
        assert!(prompt.contains("Paracetamol 500mg TID"));
    }

    #[test]
    fn summary_translation_pins_field_names_to_english() {
        let prompt = summary_translation(&sample_summary(), Language::Tamil);
        assert!(prompt.contains("Keep the JSON field names exactly as given, in English"));
        assert!(prompt.contains("\"chief_complaint\": \"<translated>\""));
    }

    // ---- assessment_translation ---

    #[test]
    fn assessment_translation_flattens_the_assessment() {
        let prompt = assessment_translation(&sample_assessment(), Language::Marathi);
        assert!(prompt.contains("to Marathi"));
        assert!(prompt.contains("Severity: 6 out of 10 (MEDIUM)"));
        assert!(prompt.contains("Apply direct pressure"));
        assert!(prompt.contains("Spreading redness"));
    }

    #[test]
    fn assessment_translation_mentions_emergency_only_when_flagged() {
        let calm = assessment_translation(&sample_assessment(), Language::Hindi);
        assert!(!calm.contains("Call emergency services"));

        let mut urgent = sample_assessment();
        urgent.call_emergency = true;
        let prompt = assessment_translation(&urgent, Language::Hindi);
        assert!(prompt.contains("Call emergency services immediately."));
    }

    #[test]
    fn assessment_translation_skips_empty_warning_signs() {
        let mut assessment = sample_assessment();
        assessment.warning_signs.clear();
        let prompt = assessment_translation(&assessment, Language::Hindi);
        assert!(!prompt.contains("Warning signs"));
    }

    // ---- instruction_translation ---

    #[test]
    fn instruction_translation_embeds_text_and_language() {
        let prompt =
            instruction_translation("Take one tablet after dinner", Language::Telugu);
        assert!(prompt.contains("to Telugu"));
        assert!(prompt.contains("Take one tablet after dinner"));
        assert!(prompt.contains("colloquial"));
        assert!(prompt.contains("Respond ONLY with the translated text in Telugu."));
    }
}
