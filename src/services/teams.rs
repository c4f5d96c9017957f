//! Team task dispatch: skill-match scoring and capacity-aware assignment.

use std::sync::Arc;

use uuid::Uuid;

use crate::domain::error::{DomainError, DomainResult};
use crate::domain::models::{
    AssignmentSuggestion, MemberRole, MemberStatus, TeamMember, TeamTask,
    MAX_CONCURRENT_TASKS, MIN_CONCURRENT_TASKS,
};
use crate::domain::ports::TeamRepository;

const SKILL_WEIGHT: f64 = 0.6;
const WORKLOAD_WEIGHT: f64 = 0.4;

/// Options for auto-assigned task creation.
#[derive(Debug, Clone, Default)]
pub struct TaskOptions {
    pub description: Option<String>,
    pub required_skills: Vec<String>,
    pub priority: Option<u8>,
    pub kind: Option<String>,
    pub dependencies: Vec<Uuid>,
}

/// Skill-match + workload scoring over a team's members.
pub struct TeamAssigner {
    teams: Arc<dyn TeamRepository>,
}

impl TeamAssigner {
    pub fn new(teams: Arc<dyn TeamRepository>) -> Self {
        Self { teams }
    }

    /// Ranked, eligible members for a set of required skills.
    ///
    /// Eligibility: not the lead, not offline, below their concurrency
    /// cap. Ranking: `0.6 · skill match + 0.4 · workload headroom`, ties
    /// broken by lower open-task count, then member id.
    pub async fn suggest_assignments(
        &self,
        team_id: Uuid,
        required_skills: &[String],
    ) -> DomainResult<Vec<AssignmentSuggestion>> {
        let members = self.teams.list_members(team_id).await?;
        let mut suggestions = Vec::new();

        for member in members {
            if member.role == MemberRole::Lead || member.status == MemberStatus::Offline {
                continue;
            }
            let current_task_count = self.teams.count_open_tasks(member.id).await?;
            if current_task_count >= member.max_concurrent_tasks as usize {
                continue;
            }
            suggestions.push(score_member(&member, current_task_count, required_skills));
        }

        suggestions.sort_by(|a, b| {
            b.overall_score
                .partial_cmp(&a.overall_score)
                .unwrap_or(std::cmp::Ordering::Equal)
                .then(a.current_task_count.cmp(&b.current_task_count))
                .then(a.member_id.cmp(&b.member_id))
        });
        Ok(suggestions)
    }

    /// Create a task assigned to the best-scoring member.
    pub async fn create_task_with_auto_assign(
        &self,
        team_id: Uuid,
        session_id: Uuid,
        title: &str,
        options: TaskOptions,
    ) -> DomainResult<TeamTask> {
        let suggestions = self
            .suggest_assignments(team_id, &options.required_skills)
            .await?;
        let best = suggestions.first().ok_or_else(|| {
            DomainError::conflict("no member has capacity for this task".to_string())
        })?;

        let mut task = TeamTask::new(team_id, session_id, title);
        task.assignee_member_id = Some(best.member_id);
        task.description = options.description;
        task.priority = options.priority.unwrap_or(3);
        task.kind = options.kind;
        task.dependencies = options.dependencies;
        if !options.required_skills.is_empty() {
            task.required_skills = Some(options.required_skills);
        }
        self.teams.create_task(&task).await?;

        // The assignee picks up the task immediately.
        if let Some(mut member) = self.teams.get_member(best.member_id).await? {
            member.current_task_id = Some(task.id);
            member.status = MemberStatus::Busy;
            self.teams.update_member(&member).await?;
        }

        Ok(task)
    }

    /// Change a member's concurrency cap; values outside [1, 10] are
    /// rejected.
    pub async fn update_member_capacity(
        &self,
        member_id: Uuid,
        max_concurrent_tasks: u32,
    ) -> DomainResult<TeamMember> {
        if !(MIN_CONCURRENT_TASKS..=MAX_CONCURRENT_TASKS).contains(&max_concurrent_tasks) {
            return Err(DomainError::validation(format!(
                "maxConcurrentTasks {max_concurrent_tasks} out of range \
                 {MIN_CONCURRENT_TASKS}..{MAX_CONCURRENT_TASKS}"
            )));
        }
        let mut member = self
            .teams
            .get_member(member_id)
            .await?
            .ok_or_else(|| DomainError::not_found(format!("team member {member_id}")))?;
        member.max_concurrent_tasks = max_concurrent_tasks;
        self.teams.update_member(&member).await?;
        Ok(member)
    }
}

fn score_member(
    member: &TeamMember,
    current_task_count: usize,
    required_skills: &[String],
) -> AssignmentSuggestion {
    let skill_match_score = if required_skills.is_empty() {
        1.0
    } else {
        let skills = member.skill_set();
        let matched = required_skills
            .iter()
            .filter(|required| skills.iter().any(|s| s == &required.to_lowercase()))
            .count();
        matched as f64 / required_skills.len() as f64
    };

    let workload_factor = 1.0 - current_task_count as f64 / f64::from(member.max_concurrent_tasks);
    let overall_score = SKILL_WEIGHT * skill_match_score + WORKLOAD_WEIGHT * workload_factor;

    AssignmentSuggestion {
        member_id: member.id,
        member_name: member.name.clone(),
        skill_match_score,
        workload_factor,
        overall_score,
        current_task_count,
    }
}
