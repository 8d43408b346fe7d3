use std::collections::HashSet;

use chrono::NaiveTime;
use proptest::prelude::*;

use xwordkit::{
    badges::{BadgeCatalog, evaluate, qualifies},
    models::{BadgeCategory, PlayerStats},
};

fn stats_strategy() -> impl Strategy<Value = PlayerStats> {
    (
        0i64..150,
        0i64..60,
        0i64..400,
        0u8..=100,
        prop::option::of(30.0f64..1200.0),
        prop::option::of(30.0f64..1200.0),
        prop::option::of((0u32..24, 0u32..60)),
        0u8..=100,
        prop::option::of(1i64..500),
    )
        .prop_map(
            |(streak, extra_longest, total, first_pct, best, last, at, weekend_pct, rank)| {
                let total = total.max(streak);
                PlayerStats {
                    current_streak: streak,
                    longest_streak: streak + extra_longest,
                    total_solved: total,
                    first_attempt_solves: total * i64::from(first_pct) / 100,
                    best_time_secs: best,
                    last_time_secs: last,
                    completed_at: at.and_then(|(h, m)| NaiveTime::from_hms_opt(h, m, 0)),
                    weekend_completions: total * i64::from(weekend_pct) / 100,
                    signup_rank: rank,
                }
            },
        )
}

fn held_strategy() -> impl Strategy<Value = HashSet<String>> {
    let ids = BadgeCatalog::standard()
        .all()
        .iter()
        .map(|badge| badge.id.clone())
        .chain(["retired-badge".to_string(), "from-the-future".to_string()])
        .collect::<Vec<_>>();
    prop::sample::subsequence(ids.clone(), 0..=ids.len()).prop_map(|ids| ids.into_iter().collect())
}

proptest! {
    #[test]
    fn never_re_awards_a_held_badge(stats in stats_strategy(), held in held_strategy()) {
        let earned = evaluate(BadgeCatalog::standard(), &stats, &held).unwrap();
        prop_assert!(earned.iter().all(|id| !held.contains(id)));
    }

    #[test]
    fn second_evaluation_with_updated_held_set_is_empty(stats in stats_strategy(), held in held_strategy()) {
        let first = evaluate(BadgeCatalog::standard(), &stats, &held).unwrap();
        let updated = held.into_iter().chain(first).collect::<HashSet<_>>();
        let second = evaluate(BadgeCatalog::standard(), &stats, &updated).unwrap();
        prop_assert!(second.is_empty());
    }

    #[test]
    fn output_is_exactly_the_qualifying_unheld_badges(stats in stats_strategy(), held in held_strategy()) {
        let earned = evaluate(BadgeCatalog::standard(), &stats, &held).unwrap();
        for badge in BadgeCatalog::standard().all() {
            let expected = qualifies(badge, &stats) && !held.contains(&badge.id);
            prop_assert_eq!(earned.contains(&badge.id), expected, "badge {}", badge.id);
        }
    }

    #[test]
    fn speed_badges_qualify_iff_time_is_at_most_the_requirement(secs in 1.0f64..1500.0) {
        let stats = PlayerStats { last_time_secs: Some(secs), ..PlayerStats::default() };
        for badge in BadgeCatalog::standard().by_category(BadgeCategory::Speed) {
            let limit = badge.requirement.unwrap() as f64;
            prop_assert_eq!(qualifies(badge, &stats), secs <= limit);
        }
    }

    #[test]
    fn counter_badges_qualify_iff_counter_is_at_least_the_requirement(count in 0i64..300) {
        let stats = PlayerStats {
            current_streak: count,
            longest_streak: count,
            total_solved: count,
            first_attempt_solves: count,
            ..PlayerStats::default()
        };
        for category in [BadgeCategory::Streak, BadgeCategory::Progress, BadgeCategory::Accuracy] {
            for badge in BadgeCatalog::standard().by_category(category) {
                let needed = badge.requirement.unwrap() as i64;
                prop_assert_eq!(qualifies(badge, &stats), count >= needed);
            }
        }
    }

    #[test]
    fn negative_counters_are_always_rejected(negative in i64::MIN..0, held in held_strategy()) {
        let stats = PlayerStats { weekend_completions: negative, ..PlayerStats::default() };
        prop_assert!(evaluate(BadgeCatalog::standard(), &stats, &held).is_err());
    }
}

#[test]
fn stat_equal_to_requirement_qualifies_in_both_directions() {
    let catalog = BadgeCatalog::standard();
    let exact_speed = PlayerStats { best_time_secs: Some(180.0), ..PlayerStats::default() };
    assert!(qualifies(catalog.get("speed-180").unwrap(), &exact_speed));

    let exact_streak = PlayerStats { current_streak: 30, longest_streak: 30, total_solved: 30, ..PlayerStats::default() };
    assert!(qualifies(catalog.get("streak-30").unwrap(), &exact_streak));
}

#[test]
fn seven_day_streak_earns_both_streak_tiers_together() {
    let stats = PlayerStats { current_streak: 7, longest_streak: 7, total_solved: 7, ..PlayerStats::default() };
    let earned = evaluate(BadgeCatalog::standard(), &stats, &HashSet::new()).unwrap();

    let streak = earned.iter().filter(|id| id.starts_with("streak-")).cloned().collect::<Vec<_>>();
    assert_eq!(streak, vec!["streak-3".to_string(), "streak-7".to_string()]);
}
