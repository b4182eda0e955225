use crate::enhancer::EnhancementTask;

pub const SYSTEM_PROMPT: &str = "You are a migration-assessment analyst. You receive detected data \
gaps for one IT asset together with the asset's known attributes. For every gap, estimate how \
confident you are that the gap is real and material, explain its impact on the migration strategy \
decision, and suggest concrete remediation steps. Respond with a single JSON object containing a \
'gaps' map with exactly the keys critical, high, medium and low, each a list of gap objects. Every \
gap object must carry asset_id, field_name, gap_type and priority; confidence_score must be a \
number between 0.0 and 1.0; ai_suggestions, when given, must be a non-empty list of short strings. \
Do not invent asset attributes that were not provided.";

/// Renders one enhancement task as the user message: the gaps to enhance,
/// the filtered asset context and any prior patterns worth replaying.
pub fn build_user_prompt(task: &EnhancementTask) -> String {
    let gaps = serde_json::to_string_pretty(&task.gaps).unwrap_or_else(|_| "[]".into());
    let context = serde_json::to_string_pretty(&task.asset.to_json()).unwrap_or_else(|_| "{}".into());

    let mut prompt = format!(
        "Asset context:\n{}\n\nDetected gaps to enhance ({} total):\n{}\n",
        context,
        task.gaps.len(),
        gaps
    );

    if !task.prior_patterns.is_empty() {
        prompt.push_str("\nResolutions that worked for similar assets in the past:\n");
        for pattern in &task.prior_patterns {
            prompt.push_str(&format!(
                "- [{}] {}: {}\n",
                pattern.asset_type, pattern.field_name, pattern.suggested_resolution
            ));
        }
    }

    prompt.push_str(
        "\nReturn the enhanced gaps as a single JSON object with the documented 'gaps' shape.",
    );
    prompt
}
