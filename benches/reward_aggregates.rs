use chrono::{Duration, Utc};
use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion};
use promptverse::models::{MedalSnapshot, Reward, Trend};
use promptverse::services::{catalog, rewards};
use sqlx::types::Json;
use uuid::Uuid;

fn create_rewards(count: usize, givers: usize) -> Vec<Reward> {
    let now = Utc::now();
    let medals = catalog::reward_type_catalog(now);
    let giver_ids: Vec<Uuid> = (0..givers).map(|_| Uuid::new_v4()).collect();

    (0..count)
        .map(|i| {
            let medal = &medals[i % medals.len()];
            Reward {
                id: Uuid::new_v4(),
                giver_id: giver_ids[i % giver_ids.len()],
                reward_type_id: medal.id,
                amount: medal.value,
                message: String::new(),
                is_anonymous: i % 7 == 0,
                medal: MedalSnapshot {
                    name: medal.name.clone(),
                    tier: medal.tier,
                    color: medal.color.clone(),
                    icon: medal.icon.clone(),
                },
                created_at: now - Duration::minutes(i as i64),
            }
        })
        .collect()
}

fn bench_recompute_aggregates(c: &mut Criterion) {
    let mut group = c.benchmark_group("recompute_aggregates");

    for count in [10, 100, 1_000, 10_000] {
        let rewards = create_rewards(count, 50);
        group.bench_with_input(BenchmarkId::new("rewards", count), &rewards, |b, rewards| {
            b.iter(|| rewards::recompute_aggregates(black_box(rewards)))
        });
    }

    group.finish();
}

fn bench_reward_summary(c: &mut Criterion) {
    let mut group = c.benchmark_group("reward_summary");

    for count in [100, 1_000, 10_000] {
        let mut trend = Trend::new(Uuid::new_v4(), Uuid::new_v4(), "bench", "bench", vec![], Utc::now());
        let rewards = create_rewards(count, 200);
        trend.aggregates = Json(rewards::recompute_aggregates(&rewards));
        trend.rewards = Json(rewards);

        group.bench_with_input(BenchmarkId::new("rewards", count), &trend, |b, trend| {
            b.iter(|| rewards::reward_summary(black_box(trend)))
        });
    }

    group.finish();
}

criterion_group!(benches, bench_recompute_aggregates, bench_reward_summary);
criterion_main!(benches);
