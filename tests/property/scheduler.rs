use std::collections::{BTreeMap, BTreeSet};

use proptest::prelude::*;
use taskqueue::scheduler::{ScheduleOutcome, start_with_report};
use taskqueue::tasks::TaskSet;
use taskqueue_test_utils::builders::TaskSetBuilder;
use taskqueue_test_utils::worker::{ScriptedWorker, WorkerEvent, groups_never_overlap};

const GROUPS: [&str; 3] = ["", "blue", "green"];

/// A generated task set plus which tasks are expected to run.
#[derive(Debug, Clone)]
struct Case {
    tasks: TaskSet,
    runnable: BTreeSet<String>,
}

// Task N may only depend on tasks 0..N-1, except for "poisoned" tasks which
// also depend on themselves and can therefore never run. Dependents of a
// poisoned task can never run either.
fn case_strategy(max_tasks: usize) -> impl Strategy<Value = Case> {
    (1..=max_tasks).prop_flat_map(|num_tasks| {
        let deps_strat = proptest::collection::vec(
            proptest::collection::vec(any::<usize>(), 0..num_tasks),
            num_tasks,
        );
        let groups_strat = proptest::collection::vec(0..GROUPS.len(), num_tasks);
        let poison_strat = proptest::collection::vec(proptest::bool::weighted(0.15), num_tasks);

        (deps_strat, groups_strat, poison_strat).prop_map(move |(raw_deps, groups, poisoned)| {
            let mut builder = TaskSetBuilder::new();
            let mut runnable = BTreeSet::new();

            for (i, potential_deps) in raw_deps.into_iter().enumerate() {
                let name = format!("task_{i:02}");

                let mut deps: BTreeSet<String> = BTreeSet::new();
                for dep_idx in potential_deps {
                    if i > 0 {
                        deps.insert(format!("task_{:02}", dep_idx % i));
                    }
                }
                if poisoned[i] {
                    deps.insert(name.clone());
                }

                let ok = !poisoned[i] && deps.iter().all(|d| runnable.contains(d));
                if ok {
                    runnable.insert(name.clone());
                }

                let dep_refs: Vec<&str> = deps.iter().map(|d| d.as_str()).collect();
                builder = builder.grouped(&name, GROUPS[groups[i]], &dep_refs);
            }

            Case {
                tasks: builder.build(),
                runnable,
            }
        })
    })
}

fn simulate(case: &Case, batch: usize) -> (Vec<WorkerEvent>, taskqueue::scheduler::ScheduleReport) {
    let runtime = tokio::runtime::Builder::new_current_thread()
        .enable_all()
        .build()
        .unwrap();

    runtime.block_on(async {
        let worker = ScriptedWorker::batched(batch);
        let (feed, sink, handle) = start_with_report(case.tasks.clone());
        tokio::time::timeout(std::time::Duration::from_secs(10), worker.run(feed, sink))
            .await
            .expect("schedule did not terminate");
        let report = handle.report().await.unwrap();
        (worker.log(), report)
    })
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(48))]

    #[test]
    fn schedule_respects_dependencies_and_groups(
        case in case_strategy(12),
        batch in 1..4usize,
    ) {
        let (log, report) = simulate(&case, batch);

        // Every task starts at most once, and only after its deps completed.
        let mut started = BTreeSet::new();
        let mut completed = BTreeSet::new();
        for event in &log {
            match event {
                WorkerEvent::Started(name) => {
                    prop_assert!(started.insert(name.clone()), "{} started twice", name);
                    for dep in case.tasks.dependencies_of(name) {
                        prop_assert!(
                            completed.contains(dep),
                            "{} started before its dependency {}",
                            name,
                            dep
                        );
                    }
                }
                WorkerEvent::Completed(name) => {
                    completed.insert(name.clone());
                }
            }
        }

        // Exactly the satisfiable tasks ran.
        prop_assert_eq!(&started, &case.runnable);

        // Distinct groups never overlapped.
        let group_of: BTreeMap<String, String> = case
            .tasks
            .iter()
            .map(|(name, task)| (name.to_string(), task.group.clone()))
            .collect();
        let group_fn = |name: &str| group_of.get(name).cloned().unwrap_or_default();
        prop_assert!(groups_never_overlap(&log, group_fn));

        // The report tells success from deadlock.
        let expected = if case.runnable.len() == case.tasks.len() {
            ScheduleOutcome::Finished
        } else {
            ScheduleOutcome::Deadlocked
        };
        prop_assert_eq!(report.outcome, expected);
    }
}
