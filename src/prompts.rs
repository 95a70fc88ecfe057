//! Prompts for caption generation.
//!
//! Every prompt string lives here so that changing the brand-safety policy
//! or the output format touches exactly one file, and so unit tests can
//! inspect the composed instruction without calling a model.
//!
//! The style policy is sent twice on every call: once in the system message
//! and again at the end of the user instruction. Models follow trailing
//! constraints more reliably, and a custom system prompt must never be able
//! to drop the policy.

use crate::attributes::{Platform, PostAttributes};
use crate::config::{BrandProfile, ResponseFormat};
use crate::variation::VariationAngle;

macro_rules! brand_safety_rules {
    () => {
        "・誇張表現や効果の断定はしない
・医療的・薬機法に抵触する表現は避ける（「改善した」「治る」などは使わない）
・煽り・強い売り込みはしない
・落ち着いた、やわらかい日本語を使う
・お客様目線で安心感を与える
・大人の女性向けのトーンにする"
    };
}

/// Brand-safety policy restated in every instruction.
pub const BRAND_SAFETY_RULES: &str = brand_safety_rules!();

/// Default system prompt: persona plus the brand-safety policy.
///
/// Used when `GenerationConfig::system_prompt` is `None`.
pub const DEFAULT_SYSTEM_PROMPT: &str = concat!(
    "あなたは経験豊富なアイリストであり、
上品で自然派の世界観を大切にする美容サロンのSNS担当者です。

以下を必ず守ってください。
",
    brand_safety_rules!(),
    "

文章は「丁寧・上品・自然体」を最優先にしてください。"
);

/// Fallback when no age band is selected.
pub const ALL_AGES: &str = "幅広い年代";

/// Fallback when no menu item is selected.
pub const NO_MENU: &str = "指定なし（画像の内容から判断してください）";

/// Fallback when no emphasis point is selected.
pub const NO_EMPHASIS: &str = "指定なし";

/// Heading that opens a platform's section in marker-format responses.
pub fn section_marker(platform: Platform) -> &'static str {
    match platform {
        Platform::Instagram => "▼Instagram用",
        Platform::X => "▼X用",
    }
}

/// JSON key for a platform in JSON-format responses.
pub fn json_key(platform: Platform) -> &'static str {
    platform.slug()
}

/// Compose the user instruction for one generation.
///
/// Pure: the same inputs always yield the same string. Randomness only
/// enters through `angle`, which the caller draws beforehand.
///
/// Every attribute is rendered, including empty selections (as an explicit
/// fallback phrase), so the model never has to guess a missing constraint.
/// Only the requested platforms get an output section.
pub fn compose(
    brand: &BrandProfile,
    attrs: &PostAttributes,
    angle: Option<VariationAngle>,
    format: ResponseFormat,
) -> String {
    let hashtag = brand.hashtag();
    let platforms = attrs.platforms();
    let mut s = String::with_capacity(1536);

    // ── Brand identity ───────────────────────────────────────────────────
    s.push_str("以下の画像をもとに、\n");
    s.push_str(&format!(
        "あなたは{}で活動する\n「{}」を大切にする\n{}の専門家です。\n",
        or_fallback(&brand.area, "地元"),
        or_fallback(&brand.concept, "お客様一人ひとりの魅力"),
        or_fallback(&brand.service, "美容サロン"),
    ));
    s.push_str(&format!("サロン名は「{}」です。\n", brand.name.trim()));
    s.push_str(&format!(
        "ターゲットは{}です。\n\n",
        or_fallback(&brand.target, "幅広いお客様")
    ));
    s.push_str("この画像を使って、新規のお客様にも伝わる\n上品で自然なSNS投稿文を作ってください。\n\n");

    // ── Conditions ───────────────────────────────────────────────────────
    s.push_str("【投稿条件】\n");
    s.push_str(&format!(
        "・投稿先：{}\n",
        join_labels(platforms.iter().map(|p| p.label()))
    ));
    s.push_str(&format!("・投稿タイプ：{}\n", attrs.post_type().label()));
    s.push_str(&format!(
        "・対象年代：{}\n",
        join_or(attrs.age_bands().iter().map(|a| a.label()), ALL_AGES)
    ));
    s.push_str(&format!("・対象性別：{}\n", attrs.gender().label()));
    s.push_str(&format!(
        "・メニュー：{}\n",
        join_or(attrs.menu_items().iter().map(|m| m.label()), NO_MENU)
    ));
    s.push_str(&format!(
        "・伝えたいポイント：{}\n",
        join_or(attrs.emphasis().iter().map(|e| e.label()), NO_EMPHASIS)
    ));
    s.push_str("・トーン：上品・自然派\n");
    if let Some(angle) = angle {
        s.push_str(&format!("・書き出し：{}\n", angle.label()));
    }
    s.push('\n');

    // ── Output format ────────────────────────────────────────────────────
    s.push_str("【出力形式】\n");
    for platform in &platforms {
        let heading = match format {
            ResponseFormat::Markers => section_marker(*platform).to_string(),
            ResponseFormat::Json => format!("■{}（\"{}\"）", platform.label(), json_key(*platform)),
        };
        s.push_str(&heading);
        s.push('\n');
        s.push_str(&platform_rules(*platform, &hashtag));
        s.push('\n');
    }

    match format {
        ResponseFormat::Markers => {
            let headings: Vec<String> = platforms
                .iter()
                .map(|p| format!("「{}」", section_marker(*p)))
                .collect();
            s.push_str(&format!(
                "各投稿文は必ず{}の見出しから始めてください。\n見出しの前に前置きや説明は書かないでください。\n\n",
                headings.join("")
            ));
        }
        ResponseFormat::Json => {
            let fields: Vec<String> = platforms
                .iter()
                .map(|p| format!("\"{}\": \"{}用の投稿文\"", json_key(*p), p.label()))
                .collect();
            s.push_str(&format!(
                "出力は次の形式のJSONオブジェクトのみとしてください（コードブロックや説明は不要です）。\n{{{}}}\n改行は \\n で表してください。\n\n",
                fields.join(", ")
            ));
        }
    }

    // ── Brand safety (restated on every call) ────────────────────────────
    s.push_str("【注意点】\n");
    s.push_str(BRAND_SAFETY_RULES);
    s.push_str("\n・Before/Afterの効果を断定しない\n・見た目の印象や雰囲気にフォーカスする\n");

    s
}

/// Format contract for one platform's section.
fn platform_rules(platform: Platform, hashtag: &str) -> String {
    match platform {
        Platform::Instagram => format!(
            "・3〜6行程度\n\
             ・やわらかく世界観を表現\n\
             ・最後に自然な導線（予約・プロフィール誘導）を1つだけ入れる\n\
             ・ハッシュタグ10〜15個\n  （業種＋地域＋ナチュラル系＋{hashtag} を必ず含める）\n"
        ),
        Platform::X => format!(
            "・140文字以内（ハッシュタグを含む）\n\
             ・余白のある文章\n\
             ・ハッシュタグ2〜3個\n  （{hashtag} を必ず含める）\n"
        ),
    }
}

fn or_fallback<'a>(value: &'a str, fallback: &'a str) -> &'a str {
    let v = value.trim();
    if v.is_empty() {
        fallback
    } else {
        v
    }
}

fn join_labels<'a>(labels: impl Iterator<Item = &'a str>) -> String {
    labels.collect::<Vec<_>>().join("、")
}

fn join_or<'a>(labels: impl Iterator<Item = &'a str>, fallback: &str) -> String {
    let joined = join_labels(labels);
    if joined.is_empty() {
        fallback.to_string()
    } else {
        joined
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::attributes::{AgeBand, EmphasisPoint, Gender, MenuItem, PostType};

    fn brand() -> BrandProfile {
        BrandProfile::new("SalonName")
            .area("吉祥寺")
            .concept("素まつげを活かすナチュラル美")
            .target("30〜40代の働く女性")
            .service("まつげパーマ")
    }

    #[test]
    fn system_prompt_carries_policy() {
        assert!(DEFAULT_SYSTEM_PROMPT.contains(BRAND_SAFETY_RULES));
        assert!(DEFAULT_SYSTEM_PROMPT.contains("アイリスト"));
    }

    #[test]
    fn compose_includes_every_attribute() {
        let attrs = PostAttributes::builder()
            .post_type(PostType::Design)
            .age_bands([AgeBand::Thirties, AgeBand::Forties])
            .gender(Gender::Female)
            .menu_item(MenuItem::LashLift)
            .emphasis([EmphasisPoint::NaturalFinish, EmphasisPoint::Gentle])
            .build()
            .unwrap();
        let prompt = compose(&brand(), &attrs, None, ResponseFormat::Markers);

        assert!(prompt.contains("#SalonName"));
        assert!(prompt.contains("デザイン紹介"));
        assert!(prompt.contains("30代、40代"));
        assert!(prompt.contains("・対象性別：女性"));
        assert!(prompt.contains("パリジェンヌラッシュリフト"));
        assert!(prompt.contains("自然な仕上がり、まつげへのやさしさ"));
        assert!(prompt.contains("吉祥寺"));
        assert!(!prompt.contains(ALL_AGES));
        assert!(!prompt.contains("書き出し："));
    }

    #[test]
    fn compose_renders_fallbacks_for_empty_sets() {
        let attrs = PostAttributes::builder().build().unwrap();
        let prompt = compose(&BrandProfile::new("SalonName"), &attrs, None, ResponseFormat::Markers);

        assert!(prompt.contains(&format!("・対象年代：{ALL_AGES}")));
        assert!(prompt.contains(&format!("・メニュー：{NO_MENU}")));
        assert!(prompt.contains(&format!("・伝えたいポイント：{NO_EMPHASIS}")));
        assert!(prompt.contains("・対象性別：指定なし"));
        assert!(prompt.contains("美容サロンの専門家"));
    }

    #[test]
    fn compose_restates_policy_every_time() {
        let attrs = PostAttributes::builder().build().unwrap();
        for format in [ResponseFormat::Markers, ResponseFormat::Json] {
            let prompt = compose(&brand(), &attrs, None, format);
            assert!(prompt.contains(BRAND_SAFETY_RULES));
            assert!(prompt.contains("Before/After"));
        }
    }

    #[test]
    fn compose_only_requests_selected_platforms() {
        let attrs = PostAttributes::builder()
            .platforms([Platform::X])
            .build()
            .unwrap();
        let prompt = compose(&brand(), &attrs, None, ResponseFormat::Markers);
        assert!(prompt.contains("▼X用"));
        assert!(!prompt.contains("▼Instagram用"));
        assert!(prompt.contains("ハッシュタグ2〜3個"));
        assert!(!prompt.contains("ハッシュタグ10〜15個"));
    }

    #[test]
    fn compose_states_angle() {
        let attrs = PostAttributes::builder().build().unwrap();
        let prompt = compose(
            &brand(),
            &attrs,
            Some(VariationAngle::FinishedLook),
            ResponseFormat::Markers,
        );
        assert!(prompt.contains("・書き出し：仕上がりの雰囲気から書き出す"));
    }

    #[test]
    fn compose_json_format_names_keys() {
        let attrs = PostAttributes::builder().build().unwrap();
        let prompt = compose(&brand(), &attrs, None, ResponseFormat::Json);
        assert!(prompt.contains(r#"{"instagram": "Instagram用の投稿文", "x": "X用の投稿文"}"#));
        assert!(!prompt.contains("▼Instagram用"));
    }

    #[test]
    fn compose_is_deterministic() {
        let attrs = PostAttributes::builder()
            .age_bands([AgeBand::Twenties, AgeBand::Teens])
            .build()
            .unwrap();
        let a = compose(&brand(), &attrs, Some(VariationAngle::Season), ResponseFormat::Json);
        let b = compose(&brand(), &attrs, Some(VariationAngle::Season), ResponseFormat::Json);
        assert_eq!(a, b);
        assert!(a.contains("10代、20代"));
    }
}
