use std::collections::{BTreeSet, HashSet};

use crate::error::{QueueError, Result};
use crate::model::frames::MAX_FRAMES;
use crate::model::{FrameSet, JobId, TaskRecord};
use crate::store::layout::Area;
use crate::store::records::{read_record, remove_record, write_record};
use crate::store::RenderQueue;

/// Union the frames of `tasks` and require the result to be one gapless run.
///
/// Overlapping frame sets are fine as long as the union has no holes.
pub fn merge_frames<'a>(tasks: impl IntoIterator<Item = &'a TaskRecord>) -> Result<FrameSet> {
    let mut union = BTreeSet::new();
    for task in tasks {
        match task.frame_set()? {
            FrameSet::Unknown => {
                return Err(QueueError::InvalidArgument(format!(
                    "task {} has no frame range and cannot be combined",
                    task.task_no
                )))
            }
            FrameSet::Frames(frames) => union.extend(frames),
        }
    }

    if union.len() > MAX_FRAMES {
        return Err(QueueError::InvalidArgument(format!(
            "combined task would hold {} frames, more than {}",
            union.len(),
            MAX_FRAMES
        )));
    }

    let merged = FrameSet::Frames(union);
    let (start, end) = merged.bounds().ok_or_else(|| {
        QueueError::InvalidArgument("nothing to combine".to_string())
    })?;
    if merged.contiguous_span().is_none() {
        return Err(QueueError::NonContiguousRange {
            start,
            end,
            count: merged.len(),
        });
    }
    Ok(merged)
}

impl RenderQueue {
    /// Combine queued tasks of one job into the first task listed.
    ///
    /// The combined frames must form a single contiguous range; otherwise
    /// `NonContiguousRange` is returned and every task is left as it was.
    /// On success the first task holds the whole range, the others are
    /// deleted, and the first task's number is returned.
    ///
    /// Any failure before the combined task is published puts the original
    /// records back in the queue unchanged.
    pub fn combine_tasks(&self, job_id: &JobId, task_nos: &[u32]) -> Result<u32> {
        if task_nos.len() < 2 {
            return Err(QueueError::InvalidArgument(
                "need at least two tasks to combine".to_string(),
            ));
        }
        let mut seen = HashSet::new();
        if let Some(dup) = task_nos.iter().find(|&&task_no| !seen.insert(task_no)) {
            return Err(QueueError::InvalidArgument(format!(
                "task {} listed more than once",
                dup
            )));
        }

        let mut staged = Vec::with_capacity(task_nos.len());
        for &task_no in task_nos {
            if let Err(e) = self.stage(job_id, task_no, "combine") {
                self.unstage(job_id, &staged);
                return Err(e);
            }
            staged.push(task_no);
        }

        let originals = match self.read_staged(job_id, &staged) {
            Ok(originals) => originals,
            Err(e) => {
                self.unstage(job_id, &staged);
                return Err(e);
            }
        };
        let survivor = match merge_frames(&originals) {
            Ok(merged) => {
                let mut survivor = originals[0].clone();
                survivor.frames = merged.to_string();
                survivor
            }
            Err(e) => {
                self.unstage(job_id, &staged);
                return Err(e);
            }
        };

        if let Err(e) = self.rewrite_combined(job_id, &survivor, &staged[1..]) {
            self.restore(job_id, &staged, &originals);
            return Err(e);
        }
        // From here every parked record is in its final form.
        self.publish(job_id, survivor.task_no)?;

        tracing::info!(
            job_id = %job_id,
            task_no = survivor.task_no,
            frames = %survivor.frames,
            combined = staged.len(),
            "Tasks combined"
        );
        Ok(survivor.task_no)
    }

    fn rewrite_combined(&self, job_id: &JobId, survivor: &TaskRecord, absorbed: &[u32]) -> Result<()> {
        let path = self
            .layout()
            .task_file(&Area::Editing, job_id, survivor.task_no);
        write_record(&path, survivor)?;
        for &task_no in absorbed {
            remove_record(&self.layout().task_file(&Area::Editing, job_id, task_no))?;
        }
        Ok(())
    }

    /// Read parked records in the given order.
    pub(super) fn read_staged(&self, job_id: &JobId, staged: &[u32]) -> Result<Vec<TaskRecord>> {
        staged
            .iter()
            .map(|&task_no| {
                let path = self.layout().task_file(&Area::Editing, job_id, task_no);
                read_record::<TaskRecord>(&path)?.ok_or(QueueError::RaceLost {
                    job_id: *job_id,
                    task_no,
                })
            })
            .collect()
    }
}
