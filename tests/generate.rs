//! Integration tests for the generation flow, driven by a scripted client.
//!
//! No network: every test swaps the provider for a [`GenerationClient`]
//! that replays canned replies and records the requests it was given.

use edgequake_salonpost::{
    generate_with_client, AnglePolicy, BrandProfile, GenerationClient, GenerationConfig,
    GenerationProgressCallback, GenerationReply, GenerationRequest, Platform, PostAttributes,
    ResponseFormat, SalonPostError, SectionError, Session, ShapeIssue, VariationAngle,
};
use edgequake_llm::ImageData;
use futures::future::BoxFuture;
use std::collections::VecDeque;
use std::sync::{Arc, Mutex};

// ── Test helpers ─────────────────────────────────────────────────────────────

/// Replays scripted replies in order, then answers every further call with
/// `fallback`.
struct ScriptedClient {
    replies: Mutex<VecDeque<Result<GenerationReply, SalonPostError>>>,
    fallback: String,
    requests: Mutex<Vec<(String, String)>>,
}

impl ScriptedClient {
    fn always(reply: &str) -> Self {
        Self {
            replies: Mutex::new(VecDeque::new()),
            fallback: reply.to_string(),
            requests: Mutex::new(Vec::new()),
        }
    }

    fn failing(error: SalonPostError) -> Self {
        let client = Self::always("");
        client.replies.lock().unwrap().push_back(Err(error));
        client
    }

    fn instructions(&self) -> Vec<String> {
        self.requests
            .lock()
            .unwrap()
            .iter()
            .map(|(instruction, _)| instruction.clone())
            .collect()
    }

    fn system_prompts(&self) -> Vec<String> {
        self.requests
            .lock()
            .unwrap()
            .iter()
            .map(|(_, system)| system.clone())
            .collect()
    }
}

impl GenerationClient for ScriptedClient {
    fn generate<'a>(
        &'a self,
        request: &'a GenerationRequest,
    ) -> BoxFuture<'a, Result<GenerationReply, SalonPostError>> {
        Box::pin(async move {
            self.requests
                .lock()
                .unwrap()
                .push((request.instruction.clone(), request.system_prompt.clone()));
            match self.replies.lock().unwrap().pop_front() {
                Some(reply) => reply,
                None => Ok(GenerationReply {
                    content: self.fallback.clone(),
                    prompt_tokens: 900,
                    completion_tokens: 250,
                }),
            }
        })
    }
}

fn image() -> ImageData {
    ImageData::new("aGVsbG8=".to_string(), "image/png")
}

fn brand() -> BrandProfile {
    BrandProfile::new("SalonName").area("吉祥寺")
}

fn both() -> PostAttributes {
    PostAttributes::builder().build().unwrap()
}

fn well_formed_reply() -> String {
    let ig_tags: Vec<String> = std::iter::once("#SalonName".to_string())
        .chain((1..10).map(|i| format!("#まつげ{i}")))
        .collect();
    format!(
        "投稿文を作成しました。\n\n▼Instagram用\nふんわりと自然な上向きまつげに。\n素まつげの美しさを大切に仕上げました。\n朝のメイクも軽やかに。\nご予約はプロフィールのリンクから。\n\n{}\n\n▼X用\n自然な上向きまつげで、朝の時間にゆとりを。 #SalonName #まつげパーマ\n",
        ig_tags.join(" ")
    )
}

async fn run(
    client: &ScriptedClient,
    attrs: &PostAttributes,
    policy: AnglePolicy,
    session: &mut Session,
    config: &GenerationConfig,
) -> Result<edgequake_salonpost::GenerationOutput, SalonPostError> {
    generate_with_client(client, image(), &brand(), attrs, policy, session, config).await
}

// ── Happy path ───────────────────────────────────────────────────────────────

#[tokio::test]
async fn marker_reply_yields_both_captions() {
    let reply = "▼Instagram用\nふんわり上向きに。\n#SalonName\n▼X用\n軽やかな目元に。 #SalonName";
    let client = ScriptedClient::always(reply);
    let mut session = Session::seeded(7);

    let output = run(&client, &both(), AnglePolicy::Random, &mut session, &GenerationConfig::default())
        .await
        .unwrap();

    for platform in [Platform::Instagram, Platform::X] {
        let text = output.text(platform).expect("caption present");
        assert!(text.contains("#SalonName"), "{platform}: {text}");
    }
    assert!(output.is_complete());
    assert_eq!(output.raw, reply);
    assert_eq!(output.stats.input_tokens, 900);
    assert_eq!(output.stats.output_tokens, 250);
    assert_eq!(session.last_angle(), output.angle);
    assert!(session.last_output().is_some());
}

#[tokio::test]
async fn well_formed_reply_has_no_shape_issues() {
    let client = ScriptedClient::always(&well_formed_reply());
    let mut session = Session::seeded(1);

    let output = run(&client, &both(), AnglePolicy::Random, &mut session, &GenerationConfig::default())
        .await
        .unwrap();

    assert!(!output.has_issues(), "{:?}", output.captions);
    assert!(!output.text(Platform::Instagram).unwrap().contains("投稿文を作成しました"));
}

#[tokio::test]
async fn captions_are_tidied() {
    let reply = "▼Instagram用\n**ふんわり上向き**に。\u{200B}\r\n#SalonName\n---\n▼X用\n軽やかに。 #SalonName";
    let client = ScriptedClient::always(reply);
    let mut session = Session::seeded(1);

    let output = run(&client, &both(), AnglePolicy::Off, &mut session, &GenerationConfig::default())
        .await
        .unwrap();

    assert_eq!(
        output.text(Platform::Instagram),
        Some("ふんわり上向きに。\n#SalonName")
    );
    // The raw reply keeps everything the model sent.
    assert!(output.raw.contains("**"));
}

#[tokio::test]
async fn json_format_round_trip() {
    let config = GenerationConfig::builder()
        .response_format(ResponseFormat::Json)
        .build()
        .unwrap();
    let client = ScriptedClient::always(
        "```json\n{\"instagram\": \"本文A\\n#SalonName\", \"x\": \"本文B #SalonName\"}\n```",
    );
    let mut session = Session::seeded(1);

    let output = run(&client, &both(), AnglePolicy::Random, &mut session, &config)
        .await
        .unwrap();

    assert_eq!(output.text(Platform::Instagram), Some("本文A\n#SalonName"));
    assert_eq!(output.text(Platform::X), Some("本文B #SalonName"));
    assert!(client.instructions()[0].contains("\"instagram\""));
}

// ── Partial and failed replies ───────────────────────────────────────────────

#[tokio::test]
async fn missing_platform_is_reported_not_blank() {
    let client = ScriptedClient::always("▼Instagram用\n本文A\n#SalonName");
    let mut session = Session::seeded(1);

    let output = run(&client, &both(), AnglePolicy::Random, &mut session, &GenerationConfig::default())
        .await
        .unwrap();

    assert_eq!(output.text(Platform::Instagram), Some("本文A\n#SalonName"));
    assert_eq!(output.text(Platform::X), None);
    assert_eq!(
        output.missing,
        vec![SectionError::Missing {
            platform: Platform::X
        }]
    );
    assert!(output.render_text().contains("▼X用\n（生成されませんでした）"));
}

#[tokio::test]
async fn unparseable_reply_keeps_raw_and_session() {
    let mut session = Session::seeded(3);
    let ok = ScriptedClient::always("▼X用\n本文 #SalonName #まつげ");
    let x_only = PostAttributes::builder()
        .platforms([Platform::X])
        .build()
        .unwrap();
    let first = run(&ok, &x_only, AnglePolicy::Pinned(VariationAngle::Season), &mut session, &GenerationConfig::default())
        .await
        .unwrap();
    assert_eq!(first.angle, Some(VariationAngle::Season));

    let raw = "申し訳ありませんが、この画像には対応できません。";
    let bad = ScriptedClient::always(raw);
    let err = run(&bad, &x_only, AnglePolicy::AvoidRepeat, &mut session, &GenerationConfig::default())
        .await
        .unwrap_err();

    assert!(matches!(err, SalonPostError::ParseFailure { .. }));
    assert_eq!(err.raw_response(), Some(raw));
    assert_eq!(session.last_angle(), Some(VariationAngle::Season));
    assert_eq!(session.last_output(), Some(&first));
}

#[tokio::test]
async fn provider_error_is_passed_through() {
    let client = ScriptedClient::failing(SalonPostError::Provider {
        message: "rate limit exceeded".into(),
    });
    let mut session = Session::seeded(1);

    let err = run(&client, &both(), AnglePolicy::Random, &mut session, &GenerationConfig::default())
        .await
        .unwrap_err();

    match err {
        SalonPostError::Provider { message } => assert_eq!(message, "rate limit exceeded"),
        other => panic!("unexpected error: {other}"),
    }
    assert_eq!(client.instructions().len(), 1, "exactly one call, no retry");
    assert!(session.last_angle().is_none());
}

#[tokio::test]
async fn missing_brand_hashtag_is_flagged() {
    let client = ScriptedClient::always("▼X用\n軽やかな目元に。 #まつげパーマ #吉祥寺");
    let x_only = PostAttributes::builder()
        .platforms([Platform::X])
        .build()
        .unwrap();
    let mut session = Session::seeded(1);

    let output = run(&client, &x_only, AnglePolicy::Random, &mut session, &GenerationConfig::default())
        .await
        .unwrap();

    let caption = output.caption(Platform::X).unwrap();
    assert_eq!(
        caption.issues,
        vec![ShapeIssue::MissingBrandHashtag {
            tag: "#SalonName".into()
        }]
    );
}

// ── Angles and the session ───────────────────────────────────────────────────

#[tokio::test]
async fn regenerate_never_repeats_the_previous_angle() {
    let client = ScriptedClient::always(&well_formed_reply());
    let mut session = Session::seeded(2024);
    let config = GenerationConfig::default();

    let first = run(&client, &both(), AnglePolicy::Random, &mut session, &config)
        .await
        .unwrap();
    let mut previous = first.angle.expect("random policy always picks an angle");

    for _ in 0..50 {
        let next = run(&client, &both(), AnglePolicy::AvoidRepeat, &mut session, &config)
            .await
            .unwrap()
            .angle
            .unwrap();
        assert_ne!(next, previous);
        previous = next;
    }

    for (instruction, _) in client.requests.lock().unwrap().iter() {
        assert!(instruction.contains("・書き出し："));
    }
}

#[tokio::test]
async fn same_seed_same_angles() {
    let config = GenerationConfig::default();
    let mut draws = Vec::new();
    for _ in 0..2 {
        let client = ScriptedClient::always(&well_formed_reply());
        let mut session = Session::seeded(99);
        let mut angles = Vec::new();
        for policy in [AnglePolicy::Random, AnglePolicy::AvoidRepeat, AnglePolicy::AvoidRepeat] {
            angles.push(run(&client, &both(), policy, &mut session, &config).await.unwrap().angle);
        }
        draws.push(angles);
    }
    assert_eq!(draws[0], draws[1]);
}

#[tokio::test]
async fn angle_off_sends_no_angle_line() {
    let client = ScriptedClient::always(&well_formed_reply());
    let mut session = Session::seeded(1);

    let output = run(&client, &both(), AnglePolicy::Off, &mut session, &GenerationConfig::default())
        .await
        .unwrap();

    assert_eq!(output.angle, None);
    assert!(!client.instructions()[0].contains("書き出し："));
    assert!(session.last_angle().is_none());
}

#[tokio::test]
async fn pinned_angle_is_stated() {
    let client = ScriptedClient::always(&well_formed_reply());
    let mut session = Session::seeded(1);

    run(
        &client,
        &both(),
        AnglePolicy::Pinned(VariationAngle::ClientFeeling),
        &mut session,
        &GenerationConfig::default(),
    )
    .await
    .unwrap();

    assert!(client.instructions()[0].contains("・書き出し：お客様の気持ちに寄り添って書き出す"));
    assert_eq!(session.last_angle(), Some(VariationAngle::ClientFeeling));
}

// ── Config plumbing ──────────────────────────────────────────────────────────

#[tokio::test]
async fn custom_system_prompt_replaces_default_only() {
    let config = GenerationConfig::builder()
        .system_prompt("あなたは眉毛専門サロンの広報担当です。")
        .build()
        .unwrap();
    let client = ScriptedClient::always(&well_formed_reply());
    let mut session = Session::seeded(1);

    run(&client, &both(), AnglePolicy::Random, &mut session, &config)
        .await
        .unwrap();

    assert_eq!(
        client.system_prompts()[0],
        "あなたは眉毛専門サロンの広報担当です。"
    );
    // The style policy is still restated in the instruction.
    assert!(client.instructions()[0].contains("【注意点】"));
}

#[derive(Default)]
struct RecordingCallback {
    events: Mutex<Vec<String>>,
}

impl GenerationProgressCallback for RecordingCallback {
    fn on_generation_start(&self, platforms: &[Platform], _angle: Option<VariationAngle>) {
        self.events
            .lock()
            .unwrap()
            .push(format!("start:{}", platforms.len()));
    }

    fn on_response(&self, _raw_len: usize) {
        self.events.lock().unwrap().push("response".into());
    }

    fn on_generation_complete(&self, produced: &[Platform], missing: &[Platform]) {
        self.events
            .lock()
            .unwrap()
            .push(format!("complete:{}/{}", produced.len(), missing.len()));
    }

    fn on_generation_error(&self, _error: &str) {
        self.events.lock().unwrap().push("error".into());
    }
}

#[tokio::test]
async fn progress_events_in_order() {
    let cb = Arc::new(RecordingCallback::default());
    let config = GenerationConfig::builder()
        .progress_callback(cb.clone() as Arc<dyn GenerationProgressCallback>)
        .build()
        .unwrap();
    let mut session = Session::seeded(1);

    let partial = ScriptedClient::always("▼Instagram用\n本文A #SalonName");
    run(&partial, &both(), AnglePolicy::Random, &mut session, &config)
        .await
        .unwrap();

    let garbage = ScriptedClient::always("no sections here");
    run(&garbage, &both(), AnglePolicy::Random, &mut session, &config)
        .await
        .unwrap_err();

    assert_eq!(
        *cb.events.lock().unwrap(),
        vec![
            "start:2",
            "response",
            "complete:1/1",
            "start:2",
            "response",
            "error"
        ]
    );
}
