use rand::Rng;
use rand::seq::IndexedRandom;

/// Sent instead of a reply when the provider call fails.
pub const FALLBACK_REPLIES: [&str; 6] = [
    "Sorry, there seems to be a temporary issue. I'll keep trying and let you know as soon as it's back online.",
    "Hmmm, something's not quite right. I'm on the case and will update you when it's working again.",
    "Looks like I'm having a bit of a moment. I'm keeping an eye on it and will let you know when it's back up.",
    "Whoops, I seem to be down at the moment. I'll do my best to reconnect and keep you posted.",
    "That's bad, I can't seem to reach the destination endpoint. But I'll get back to you when I'm online.",
    "Oh no, I'm down. I'll keep trying and notify you when I'm back online.",
];

pub fn pick_fallback<R: Rng + ?Sized>(rng: &mut R) -> &'static str {
    FALLBACK_REPLIES
        .choose(rng)
        .copied()
        .unwrap_or(FALLBACK_REPLIES[0])
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::SeedableRng;
    use rand::rngs::StdRng;
    use std::collections::HashSet;

    #[test]
    fn every_reply_is_reachable() {
        let mut rng = StdRng::seed_from_u64(42);
        let seen: HashSet<&str> = (0..500).map(|_| pick_fallback(&mut rng)).collect();
        assert_eq!(seen.len(), FALLBACK_REPLIES.len());
    }

    #[test]
    fn replies_are_distinct() {
        let unique: HashSet<&str> = FALLBACK_REPLIES.iter().copied().collect();
        assert_eq!(unique.len(), FALLBACK_REPLIES.len());
    }
}
