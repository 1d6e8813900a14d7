mod test_harness;

use std::fs;

use render_queue::model::worker::status;
use render_queue::model::{JobId, NewJob, TaskRecord};
use render_queue::store::layout::{JOBS_DIR, WORKERS_DIR, WORKER_INFO_FILE};
use render_queue::QueueError;
use test_harness::TestQueue;

#[test]
fn test_open_creates_layout() {
    let t = TestQueue::new();
    let root = t.dir.path();
    for dir in [
        "jobs",
        "tasks/queued",
        "tasks/completed",
        "tasks/failed",
        "tasks/editing",
        "workers",
    ] {
        assert!(root.join(dir).is_dir(), "missing {}", dir);
    }

    // Opening an existing queue again is fine.
    let again = t.reopen();
    assert!(again.list_jobs().unwrap().is_empty());
}

#[test]
fn test_create_job_seeds_numbered_queued_tasks() {
    let t = TestQueue::new();
    let job_id = t.submit("shot_010", 70, &["1-10", "11-20", "21-30"]);

    let job = t.queue.read_job(&job_id).unwrap();
    assert_eq!(job.name, "shot_010");
    assert_eq!(job.priority, 70);
    assert_eq!(job.tasks, vec!["1-10", "11-20", "21-30"]);

    assert_eq!(
        t.statuses(&job_id),
        vec![(0, "Queued"), (1, "Queued"), (2, "Queued")]
    );
    assert_eq!(t.queue.queued_tasks(&job_id).unwrap(), vec![0, 1, 2]);

    let queued = t.dir.path().join("tasks/queued");
    assert!(queued.join(format!("{}_0002.json", job_id)).is_file());
}

#[test]
fn test_records_use_collaborator_field_names() {
    let t = TestQueue::new();
    let job_id = t.queue
        .create_job(
            NewJob::new("shot_020", "Nuke")
                .with_task("1-5")
                .with_param("command", "nuke -x comp.nk")
                .with_param("threads", 8),
        )
        .unwrap();

    let raw = fs::read_to_string(t.dir.path().join(JOBS_DIR).join(format!("{}.json", job_id))).unwrap();
    let value: serde_json::Value = serde_json::from_str(&raw).unwrap();
    assert_eq!(value["jobID"], job_id.to_string());
    assert_eq!(value["jobName"], "shot_020");
    assert_eq!(value["jobType"], "Nuke");
    assert_eq!(value["priority"], 50);
    assert_eq!(value["command"], "nuke -x comp.nk");
    assert_eq!(value["threads"], 8);
    assert_eq!(value["nextTaskNo"], 1);

    let raw = fs::read_to_string(
        t.dir.path().join("tasks/queued").join(format!("{}_0000.json", job_id)),
    )
    .unwrap();
    let task: TaskRecord = serde_json::from_str(&raw).unwrap();
    assert_eq!(task.job_id, job_id);
    assert_eq!(task.task_no, 0);
    assert_eq!(task.frames, "1-5");
    assert!(raw.contains("\"taskNo\""));
}

#[test]
fn test_create_job_rejects_bad_input() {
    let t = TestQueue::new();

    let err = t.queue.create_job(NewJob::new("empty", "Maya")).unwrap_err();
    assert!(matches!(err, QueueError::InvalidArgument(_)));

    for priority in [-1, 101] {
        let err = t.queue
            .create_job(NewJob::new("bad", "Maya").with_priority(priority).with_task("1"))
            .unwrap_err();
        assert!(matches!(err, QueueError::InvalidArgument(_)));
    }

    let err = t.queue
        .create_job(NewJob::new("bad", "Maya").with_task("1-5").with_task("ten"))
        .unwrap_err();
    assert!(matches!(err, QueueError::InvalidArgument(_)));

    // Nothing was left behind by the rejected submissions.
    assert!(t.queue.list_jobs().unwrap().is_empty());
    assert_eq!(fs::read_dir(t.dir.path().join("tasks/queued")).unwrap().count(), 0);
}

#[test]
fn test_unknown_frames_task() {
    let t = TestQueue::new();
    let job_id = t.submit("sim", 50, &["Unknown"]);
    assert_eq!(t.frames(&job_id), vec![(0, "Unknown".to_string())]);
}

#[test]
fn test_set_job_priority_writes_only_on_change() {
    let t = TestQueue::new();
    let job_id = t.submit("shot_010", 50, &["1-10"]);

    assert!(t.queue.set_job_priority(&job_id, 90).unwrap());
    assert!(!t.queue.set_job_priority(&job_id, 90).unwrap());
    assert_eq!(t.queue.job_priority(&job_id).unwrap(), 90);

    let err = t.queue.set_job_priority(&job_id, 101).unwrap_err();
    assert!(matches!(err, QueueError::InvalidArgument(_)));
    assert_eq!(t.queue.job_priority(&job_id).unwrap(), 90);

    let err = t.queue.set_job_priority(&JobId::new(), 10).unwrap_err();
    assert!(matches!(err, QueueError::JobNotFound(_)));
}

#[test]
fn test_priority_change_does_not_resurrect_deleted_job() {
    let t = TestQueue::new();
    let job_id = t.submit("shot_010", 50, &["1-10"]);
    t.queue.delete_job(&job_id).unwrap();

    let err = t.queue.set_job_priority(&job_id, 90).unwrap_err();
    assert!(matches!(err, QueueError::JobNotFound(_)));
    assert!(!t
        .dir
        .path()
        .join(JOBS_DIR)
        .join(format!("{}.json", job_id))
        .exists());
    assert!(t.queue.list_jobs().unwrap().is_empty());
}

#[test]
fn test_list_jobs_skips_corrupt_records() {
    let t = TestQueue::new();
    let job_id = t.submit("good", 50, &["1"]);
    fs::write(
        t.dir.path().join(JOBS_DIR).join(format!("{}.json", JobId::new())),
        "{ not json",
    )
    .unwrap();

    let jobs = t.queue.list_jobs().unwrap();
    assert_eq!(jobs.len(), 1);
    assert_eq!(jobs[0].id, job_id);
}

#[test]
fn test_delete_job_removes_every_area() {
    let t = TestQueue::new();
    let worker = t.register("node01");
    let job_id = t.submit("shot_010", 50, &["1", "2", "3", "4"]);

    t.queue.claim(&job_id, 0, &worker).unwrap();
    t.queue.complete_task(&job_id, 1, &Default::default()).unwrap();
    t.queue.fail_task(&job_id, 2, &Default::default()).unwrap();

    let deletion = t.queue.delete_job(&job_id).unwrap();
    assert!(deletion.job_record_removed);
    assert_eq!(deletion.removed_tasks, 4);
    assert_eq!(deletion.in_flight, vec![(0, worker)]);
    assert!(deletion.has_in_flight());

    assert!(t.queue.list_tasks(&job_id).unwrap().is_empty());
    assert!(t.queue.read_job(&job_id).unwrap_err().is_not_found());
    assert!(t.queue.claimed_tasks(&worker).unwrap().is_empty());

    let err = t.queue.delete_job(&job_id).unwrap_err();
    assert!(matches!(err, QueueError::JobNotFound(_)));
}

#[test]
fn test_archive_job_is_unsupported() {
    let t = TestQueue::new();
    let job_id = t.submit("shot_010", 50, &["1-10"]);

    let err = t.queue.archive_job(&job_id).unwrap_err();
    assert!(matches!(err, QueueError::Unsupported(_)));
    assert!(t.queue.read_job(&job_id).is_ok());

    let err = t.queue.archive_job(&JobId::new()).unwrap_err();
    assert!(matches!(err, QueueError::JobNotFound(_)));
}

#[test]
fn test_worker_registration_and_status() {
    let t = TestQueue::new();
    let worker = t.register("node01");

    let record = t.queue.read_worker(&worker).unwrap();
    assert_eq!(record.name, "node01");
    assert_eq!(record.hostname, "render01");
    assert_eq!(record.status, status::IDLE);

    let info = t
        .dir
        .path()
        .join(WORKERS_DIR)
        .join(worker.to_string())
        .join(WORKER_INFO_FILE);
    assert!(info.is_file());

    assert!(t.queue.set_worker_status(&worker, status::DISABLED).unwrap());
    assert!(!t.queue.set_worker_status(&worker, status::DISABLED).unwrap());
    assert_eq!(t.queue.worker_status(&worker).unwrap(), status::DISABLED);
}

#[test]
fn test_list_workers_sorted_and_tolerant() {
    let t = TestQueue::new();
    let b = t.register("node-b");
    let a = t.register("node-a");

    // A worker directory with a corrupt info record is skipped.
    let broken = t.dir.path().join(WORKERS_DIR).join("broken");
    fs::create_dir(&broken).unwrap();
    fs::write(broken.join(WORKER_INFO_FILE), "[]").unwrap();
    // Stray files in the workers namespace are ignored.
    fs::write(t.dir.path().join(WORKERS_DIR).join("notes.txt"), "hi").unwrap();

    let ids: Vec<_> = t.queue.list_workers().unwrap().iter().map(|w| w.id).collect();
    assert_eq!(ids, vec![a, b]);
}

#[test]
fn test_delete_worker_reports_abandoned_tasks() {
    let t = TestQueue::new();
    let worker = t.register("node01");
    let job_id = t.submit("shot_010", 50, &["1-10"]);
    t.queue.claim(&job_id, 0, &worker).unwrap();

    let removal = t.queue.delete_worker(&worker).unwrap();
    assert_eq!(removal.abandoned, vec![(job_id, 0)]);
    assert!(t.queue.list_workers().unwrap().is_empty());
    assert!(t.queue.list_tasks(&job_id).unwrap().is_empty());

    let err = t.queue.delete_worker(&worker).unwrap_err();
    assert!(matches!(err, QueueError::WorkerNotFound(_)));
}
