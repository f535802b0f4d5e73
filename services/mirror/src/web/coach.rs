//! services/mirror/src/web/coach.rs
//!
//! The canned trampoline coach behind `POST /trick-ai`.

use crate::error::ApiError;
use crate::web::protocol::ChatRequest;
use crate::web::routes::{InterceptedRequest, Outcome, RouteContext};
use crate::web::stream::{event_stream_response, ChunkStream};
use regex::Regex;
use std::sync::LazyLock;
use tracing::debug;

pub const SIGN_IN_PROMPT: &str = "Please sign in to use Trick AI!";
pub const COACH_PREFIX: &str = "I'm your trampoline trick coach! ";

static SPIN_DEGREES: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(180|270|540|720|900)").expect("static regex is valid"));

const AFTER_360: &str = "After mastering a 360, great next steps include:\n\n1. **540** - Add another half rotation\n2. **360 with grab** - Add style (safety, mute, or seat grab)\n3. **Back flip** - Start working on rotation skills\n4. **Front flip** - Different rotation axis\n\nI'd recommend starting with grab variations to build control, then progress to 540 or start flips!";

const BACK_FLIP: &str = "Back flip tips:\n\n**Progression:**\n1. Start with back drops to build confidence\n2. Practice setting (jumping straight up, arms up)\n3. Look for your feet at the peak\n4. Spot your landing\n\n**Safety:**\n- Always have a spotter first time\n- Don't throw your head back\n- Jump UP first, rotate second\n- Land with knees slightly bent\n\nWant details on any of these steps?";

const FRONT_FLIP: &str = "Front flip progression:\n\n**Steps:**\n1. Master front drops first\n2. Practice the tuck position on ground\n3. Jump and pull knees to chest\n4. Look for the mat to spot landing\n\n**Common mistakes:**\n- Jumping forward instead of up\n- Not tucking tight enough\n- Opening too early\n\nPractice the motion into the pit or with mats first!";

const SAFETY: &str = "**Trampoline Safety Essentials:**\n\n✓ Always warm up (5-10 min)\n✓ One person at a time\n✓ Clear the area of objects\n✓ Use pads on springs\n✓ Learn progressions (don't skip steps)\n✓ Practice new tricks into pit/foam first\n✓ Have a spotter for flips\n\nWhat specific trick are you working on?";

const GRABS: &str = "**Grab variations:**\n\n- **Safety**: Grab behind knees (easiest)\n- **Mute**: Grab opposite foot\n- **Seat/Tail**: Grab behind you\n- **Nose**: Grab in front\n\nStart with safety grabs during seat drops, then add to spins. Grabs add style and control!";

const GENERAL_HELP: &str = "I can help with:\n\n- Specific tricks (back flip, 360, etc.)\n- Progressions (what to learn next)\n- Safety tips\n- Grab variations\n- Flip techniques\n\nWhat would you like to know more about?";

/// Picks the coaching reply for `message`. The first matching topic wins.
pub fn coaching_reply(message: &str) -> String {
    let msg = message.to_lowercase();

    let body = if msg.contains("360") && msg.contains("after") {
        AFTER_360.to_string()
    } else if msg.contains("back flip") || msg.contains("backflip") {
        BACK_FLIP.to_string()
    } else if msg.contains("front flip") || msg.contains("frontflip") {
        FRONT_FLIP.to_string()
    } else if msg.contains("safety") || msg.contains("safe") {
        SAFETY.to_string()
    } else if msg.contains("grab") {
        GRABS.to_string()
    } else if let Some(degrees) = SPIN_DEGREES.find(&msg) {
        format!(
            "**{} tips:**\n\nProgression from 360:\n- Practice the spin in parts\n- Use your arms to generate rotation\n- Spot your landing earlier\n- Keep your core tight\n\nThe key is commitment and consistent practice. Start on lower bounces and work up!",
            degrees.as_str()
        )
    } else {
        GENERAL_HELP.to_string()
    };

    format!("{}{}", COACH_PREFIX, body)
}

/// `POST /trick-ai`: a streamed reply, or a streamed sign-in prompt when signed out.
pub fn trick_ai(req: &InterceptedRequest, ctx: &RouteContext) -> Result<Outcome, ApiError> {
    let reply = match ctx.session.current_identity() {
        None => SIGN_IN_PROMPT.to_string(),
        Some(identity) => {
            let chat: ChatRequest = req.json()?;
            debug!(email = %identity.email, "Coaching reply requested.");
            coaching_reply(&chat.message)
        }
    };

    let stream = ChunkStream::spawn(&reply, ctx.stream_delay);
    Ok(Outcome::Respond(event_stream_response(stream)))
}
