//! Static persona catalog and voice alias table.

use serde::Serialize;

pub const DEFAULT_VOICE: &str = "Orus";

/// Display alias and the prebuilt Gemini voice it maps to.
#[derive(Debug, Clone, Copy, Serialize)]
pub struct VoiceAlias {
    pub alias: &'static str,
    pub voice: &'static str,
}

const fn alias(alias: &'static str, voice: &'static str) -> VoiceAlias {
    VoiceAlias { alias, voice }
}

pub const ALIASED_VOICES: &[VoiceAlias] = &[
    alias("Orus", "Orus"),
    alias("Sirius", "Zephyr"),
    alias("Vega", "Puck"),
    alias("Altair", "Charon"),
    alias("Luna", "Luna"),
    alias("Nova", "Nova"),
    alias("Celeste", "Kore"),
    alias("Polaris", "Fenrir"),
    alias("Andromeda", "Leda"),
    alias("Aria", "Aoede"),
    alias("Rhea", "Callirrhoe"),
    alias("Elara", "Autonoe"),
    alias("Enceladus", "Enceladus"),
    alias("Iapetus", "Iapetus"),
    alias("Umbriel", "Umbriel"),
    alias("Gold", "Algieba"),
    alias("Silver", "Despina"),
    alias("Platinum", "Erinome"),
    alias("Palladium", "Algenib"),
    alias("Rhodium", "Rasalgethi"),
    alias("Iridium", "Laomedeia"),
    alias("Osmium", "Achernar"),
    alias("Comet", "Alnilam"),
    alias("Nebula", "Schedar"),
    alias("Galaxy", "Gacrux"),
    alias("Pulsar", "Pulcherrima"),
    alias("Quasar", "Achird"),
    alias("Zenith", "Zubenelgenubi"),
    alias("Vertex", "Vindemiatrix"),
    alias("Solstice", "Sadachbia"),
    alias("Stardust", "Sadaltager"),
    alias("Supernova", "Sulafat"),
];

/// Resolve either an alias or a raw voice name to the prebuilt voice name.
pub fn resolve_voice(name: &str) -> Option<&'static str> {
    ALIASED_VOICES
        .iter()
        .find(|v| v.alias.eq_ignore_ascii_case(name) || v.voice.eq_ignore_ascii_case(name))
        .map(|v| v.voice)
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum PersonaCategory {
    CustomerService,
    Showcase,
}

#[derive(Debug, Clone, Serialize)]
pub struct Persona {
    pub id: String,
    pub name: String,
    pub tagline: String,
    pub description: String,
    /// Material icon name.
    pub avatar: String,
    pub voice_name: String,
    pub category: PersonaCategory,
}

struct PersonaSeed {
    name: &'static str,
    tagline: &'static str,
    description: &'static str,
    avatar: &'static str,
    category: PersonaCategory,
}

const fn csr(
    name: &'static str,
    tagline: &'static str,
    description: &'static str,
    avatar: &'static str,
) -> PersonaSeed {
    PersonaSeed { name, tagline, description, avatar, category: PersonaCategory::CustomerService }
}

const fn showcase(
    name: &'static str,
    tagline: &'static str,
    description: &'static str,
    avatar: &'static str,
) -> PersonaSeed {
    PersonaSeed { name, tagline, description, avatar, category: PersonaCategory::Showcase }
}

const PERSONAS: &[PersonaSeed] = &[
    csr("Clara", "Calm Helper", "A warm, steady, and empathetic tone. Perfect for de-escalation and providing reassuring support.", "support_agent"),
    csr("James", "Professional Agent", "A crisp, clear, and efficient voice with a neutral accent. Ideal for corporate and formal interactions.", "business_center"),
    csr("Maya", "Friendly Guide", "A bright, conversational, and approachable voice that makes customers feel comfortable and welcome.", "emoji_people"),
    csr("Omar", "Trust Builder", "A deep, reassuring, and confidence-boosting tone that conveys authority and reliability.", "verified_user"),
    csr("Sophia", "Empathetic Listener", "A gentle, patient, and understanding style that excels at handling sensitive customer issues.", "hearing"),
    csr("Ethan", "Quick Responder", "A fast-paced yet polite and clear voice, suitable for high-volume support queues.", "bolt"),
    csr("Lila", "Multilingual CSR", "A neutral, adaptable English voice, perfect for environments requiring code-switching or accented variants.", "translate"),
    csr("Daniel", "Corporate Formal", "A reserved, authoritative, and compliance-oriented style for official communications.", "corporate_fare"),
    csr("Rina", "Youthful Support", "A lively, casual voice with millennial energy, great for B2C brands targeting a younger demographic.", "celebration"),
    csr("Victor", "Technical Support", "A straightforward, no-nonsense, and precise tone with a calm delivery for explaining complex solutions.", "build"),
    showcase("Nova", "Energetic Storyteller", "An animated, hype, and lively voice that captivates audiences in stories and advertisements.", "auto_stories"),
    showcase("Serena", "Soft Narrator", "A slow, soothing, and gentle delivery perfect for audiobooks, meditation, and relaxation content.", "local_library"),
    showcase("Kai", "Confident Leader", "An assertive voice with a strong executive presence, ideal for presentations and leadership messages.", "leaderboard"),
    showcase("Ella", "Radio Host", "A smooth, dynamic voice with broadcaster energy, suitable for podcasts and radio commercials.", "radio"),
    showcase("Leo", "Casual Friend", "A relaxed, easy-going, and natural conversational style that feels like talking to a close friend.", "forum"),
    showcase("Amira", "Motivational Coach", "An uplifting, encouraging, and spirited voice that inspires action and positivity.", "sports_gymnastics"),
    showcase("Hiro", "Calm Teacher", "A measured, instructional, and patient delivery, perfect for e-learning and educational content.", "school"),
    showcase("Sasha", "Playful Entertainer", "A cheerful, humorous, and lighthearted tone for comedy, childrens content, and entertainment.", "mood"),
    showcase("Marcus", "Documentary Narrator", "A deep, serious voice with dramatic pacing, ideal for documentary films and historical narratives.", "history_edu"),
    showcase("Ivy", "Sleek Corporate Presenter", "A polished, articulate, and professional voice for keynote speeches and corporate videos.", "slideshow"),
];

/// Read-only persona table, built once at startup.
#[derive(Debug, Clone)]
pub struct Catalog {
    personas: Vec<Persona>,
}

impl Catalog {
    /// The built-in personas, voices assigned round-robin over [`ALIASED_VOICES`].
    pub fn builtin() -> Self {
        let personas = PERSONAS
            .iter()
            .enumerate()
            .map(|(index, seed)| Persona {
                id: seed.name.to_lowercase(),
                name: seed.name.into(),
                tagline: seed.tagline.into(),
                description: seed.description.into(),
                avatar: seed.avatar.into(),
                voice_name: ALIASED_VOICES[index % ALIASED_VOICES.len()].voice.into(),
                category: seed.category,
            })
            .collect();
        Self { personas }
    }

    pub fn personas(&self) -> &[Persona] {
        &self.personas
    }

    pub fn get(&self, id: &str) -> Option<&Persona> {
        self.personas.iter().find(|p| p.id == id)
    }
}
