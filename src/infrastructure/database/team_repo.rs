//! SQLite implementation of `TeamRepository`.

use async_trait::async_trait;
use sqlx::SqlitePool;
use uuid::Uuid;

use super::utils::{parse_datetime, parse_datetime_opt, parse_json, parse_uuid, parse_uuid_opt, to_json};
use crate::domain::error::{DomainError, DomainResult};
use crate::domain::models::{
    MemberRole, MemberStatus, Team, TeamMember, TeamSession, TeamStatus, TeamTask,
    TeamTaskStatus,
};
use crate::domain::ports::TeamRepository;

pub struct TeamRepositoryImpl {
    pool: SqlitePool,
}

impl TeamRepositoryImpl {
    pub const fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }
}

#[derive(sqlx::FromRow)]
struct TeamRow {
    id: String,
    name: String,
    project_id: String,
    lead_member_id: String,
    member_ids: String,
    status: String,
    created_at: String,
    config: String,
}

impl TeamRow {
    fn into_team(self) -> DomainResult<Team> {
        let status = TeamStatus::from_str(&self.status).ok_or_else(|| {
            DomainError::Operational(format!("unknown team status '{}'", self.status))
        })?;
        let member_ids: Vec<String> = parse_json(&self.member_ids)?;
        Ok(Team {
            id: parse_uuid(&self.id)?,
            name: self.name,
            project_id: parse_uuid(&self.project_id)?,
            lead_member_id: parse_uuid(&self.lead_member_id)?,
            member_ids: member_ids
                .iter()
                .map(|s| parse_uuid(s))
                .collect::<DomainResult<Vec<_>>>()?,
            status,
            created_at: parse_datetime(&self.created_at)?,
            config: parse_json(&self.config)?,
        })
    }
}

#[derive(sqlx::FromRow)]
struct MemberRow {
    id: String,
    team_id: String,
    name: String,
    role: String,
    specialty: String,
    expertise: String,
    status: String,
    current_task_id: Option<String>,
    max_concurrent_tasks: i64,
}

impl MemberRow {
    fn into_member(self) -> DomainResult<TeamMember> {
        let role = MemberRole::from_str(&self.role).ok_or_else(|| {
            DomainError::Operational(format!("unknown member role '{}'", self.role))
        })?;
        let status = MemberStatus::from_str(&self.status).ok_or_else(|| {
            DomainError::Operational(format!("unknown member status '{}'", self.status))
        })?;
        Ok(TeamMember {
            id: parse_uuid(&self.id)?,
            team_id: parse_uuid(&self.team_id)?,
            name: self.name,
            role,
            specialty: parse_json(&self.specialty)?,
            expertise: parse_json(&self.expertise)?,
            status,
            current_task_id: parse_uuid_opt(self.current_task_id.as_deref())?,
            max_concurrent_tasks: self.max_concurrent_tasks as u32,
        })
    }
}

#[derive(sqlx::FromRow)]
struct TaskRow {
    id: String,
    team_id: String,
    session_id: String,
    assignee_member_id: Option<String>,
    title: String,
    description: Option<String>,
    status: String,
    dependencies: String,
    created_at: String,
    completed_at: Option<String>,
    result: Option<String>,
    kind: Option<String>,
    required_skills: Option<String>,
    priority: i64,
}

impl TaskRow {
    fn into_task(self) -> DomainResult<TeamTask> {
        let status = TeamTaskStatus::from_str(&self.status).ok_or_else(|| {
            DomainError::Operational(format!("unknown team task status '{}'", self.status))
        })?;
        let deps: Vec<String> = parse_json(&self.dependencies)?;
        Ok(TeamTask {
            id: parse_uuid(&self.id)?,
            team_id: parse_uuid(&self.team_id)?,
            session_id: parse_uuid(&self.session_id)?,
            assignee_member_id: parse_uuid_opt(self.assignee_member_id.as_deref())?,
            title: self.title,
            description: self.description,
            status,
            dependencies: deps
                .iter()
                .map(|s| parse_uuid(s))
                .collect::<DomainResult<Vec<_>>>()?,
            created_at: parse_datetime(&self.created_at)?,
            completed_at: parse_datetime_opt(self.completed_at.as_deref())?,
            result: self.result,
            kind: self.kind,
            required_skills: self
                .required_skills
                .as_deref()
                .map(parse_json)
                .transpose()?,
            priority: self.priority as u8,
        })
    }
}

#[derive(sqlx::FromRow)]
struct TeamSessionRow {
    id: String,
    team_id: String,
    project_id: String,
    started_at: String,
    ended_at: Option<String>,
    status: String,
    goal: Option<String>,
}

impl TeamSessionRow {
    fn into_session(self) -> DomainResult<TeamSession> {
        let status = TeamStatus::from_str(&self.status).ok_or_else(|| {
            DomainError::Operational(format!("unknown team status '{}'", self.status))
        })?;
        Ok(TeamSession {
            id: parse_uuid(&self.id)?,
            team_id: parse_uuid(&self.team_id)?,
            project_id: parse_uuid(&self.project_id)?,
            started_at: parse_datetime(&self.started_at)?,
            ended_at: parse_datetime_opt(self.ended_at.as_deref())?,
            status,
            goal: self.goal,
        })
    }
}

#[async_trait]
impl TeamRepository for TeamRepositoryImpl {
    async fn create_team(&self, team: &Team) -> DomainResult<()> {
        let member_ids: Vec<String> = team.member_ids.iter().map(|m| m.to_string()).collect();
        sqlx::query(
            "INSERT INTO teams (id, name, project_id, lead_member_id, member_ids, status, \
             created_at, config) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)",
        )
        .bind(team.id.to_string())
        .bind(&team.name)
        .bind(team.project_id.to_string())
        .bind(team.lead_member_id.to_string())
        .bind(to_json(&member_ids)?)
        .bind(team.status.as_str())
        .bind(team.created_at.to_rfc3339())
        .bind(to_json(&team.config)?)
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    async fn get_team(&self, id: Uuid) -> DomainResult<Option<Team>> {
        let row: Option<TeamRow> = sqlx::query_as(
            "SELECT id, name, project_id, lead_member_id, member_ids, status, created_at, \
             config FROM teams WHERE id = ?1",
        )
        .bind(id.to_string())
        .fetch_optional(&self.pool)
        .await?;
        row.map(TeamRow::into_team).transpose()
    }

    async fn update_team(&self, team: &Team) -> DomainResult<()> {
        let member_ids: Vec<String> = team.member_ids.iter().map(|m| m.to_string()).collect();
        let result = sqlx::query(
            "UPDATE teams SET name = ?2, lead_member_id = ?3, member_ids = ?4, status = ?5, \
             config = ?6 WHERE id = ?1",
        )
        .bind(team.id.to_string())
        .bind(&team.name)
        .bind(team.lead_member_id.to_string())
        .bind(to_json(&member_ids)?)
        .bind(team.status.as_str())
        .bind(to_json(&team.config)?)
        .execute(&self.pool)
        .await?;
        if result.rows_affected() == 0 {
            return Err(DomainError::not_found(format!("team {}", team.id)));
        }
        Ok(())
    }

    async fn delete_team(&self, id: Uuid) -> DomainResult<()> {
        let result = sqlx::query("DELETE FROM teams WHERE id = ?1")
            .bind(id.to_string())
            .execute(&self.pool)
            .await?;
        if result.rows_affected() == 0 {
            return Err(DomainError::not_found(format!("team {id}")));
        }
        Ok(())
    }

    async fn list_teams_by_project(&self, project_id: Uuid) -> DomainResult<Vec<Team>> {
        let rows: Vec<TeamRow> = sqlx::query_as(
            "SELECT id, name, project_id, lead_member_id, member_ids, status, created_at, \
             config FROM teams WHERE project_id = ?1 ORDER BY created_at",
        )
        .bind(project_id.to_string())
        .fetch_all(&self.pool)
        .await?;
        rows.into_iter().map(TeamRow::into_team).collect()
    }

    async fn add_member(&self, member: &TeamMember) -> DomainResult<()> {
        sqlx::query(
            "INSERT INTO team_members (id, team_id, name, role, specialty, expertise, status, \
             current_task_id, max_concurrent_tasks) \
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9)",
        )
        .bind(member.id.to_string())
        .bind(member.team_id.to_string())
        .bind(&member.name)
        .bind(member.role.as_str())
        .bind(to_json(&member.specialty)?)
        .bind(to_json(&member.expertise)?)
        .bind(member.status.as_str())
        .bind(member.current_task_id.map(|t| t.to_string()))
        .bind(i64::from(member.max_concurrent_tasks))
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    async fn get_member(&self, id: Uuid) -> DomainResult<Option<TeamMember>> {
        let row: Option<MemberRow> = sqlx::query_as(
            "SELECT id, team_id, name, role, specialty, expertise, status, current_task_id, \
             max_concurrent_tasks FROM team_members WHERE id = ?1",
        )
        .bind(id.to_string())
        .fetch_optional(&self.pool)
        .await?;
        row.map(MemberRow::into_member).transpose()
    }

    async fn update_member(&self, member: &TeamMember) -> DomainResult<()> {
        let result = sqlx::query(
            "UPDATE team_members SET name = ?2, role = ?3, specialty = ?4, expertise = ?5, \
             status = ?6, current_task_id = ?7, max_concurrent_tasks = ?8 WHERE id = ?1",
        )
        .bind(member.id.to_string())
        .bind(&member.name)
        .bind(member.role.as_str())
        .bind(to_json(&member.specialty)?)
        .bind(to_json(&member.expertise)?)
        .bind(member.status.as_str())
        .bind(member.current_task_id.map(|t| t.to_string()))
        .bind(i64::from(member.max_concurrent_tasks))
        .execute(&self.pool)
        .await?;
        if result.rows_affected() == 0 {
            return Err(DomainError::not_found(format!("team member {}", member.id)));
        }
        Ok(())
    }

    async fn list_members(&self, team_id: Uuid) -> DomainResult<Vec<TeamMember>> {
        let rows: Vec<MemberRow> = sqlx::query_as(
            "SELECT id, team_id, name, role, specialty, expertise, status, current_task_id, \
             max_concurrent_tasks FROM team_members WHERE team_id = ?1 ORDER BY name",
        )
        .bind(team_id.to_string())
        .fetch_all(&self.pool)
        .await?;
        rows.into_iter().map(MemberRow::into_member).collect()
    }

    async fn create_task(&self, task: &TeamTask) -> DomainResult<()> {
        let deps: Vec<String> = task.dependencies.iter().map(|d| d.to_string()).collect();
        sqlx::query(
            "INSERT INTO team_tasks (id, team_id, session_id, assignee_member_id, title, \
             description, status, dependencies, created_at, completed_at, result, kind, \
             required_skills, priority) \
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12, ?13, ?14)",
        )
        .bind(task.id.to_string())
        .bind(task.team_id.to_string())
        .bind(task.session_id.to_string())
        .bind(task.assignee_member_id.map(|m| m.to_string()))
        .bind(&task.title)
        .bind(&task.description)
        .bind(task.status.as_str())
        .bind(to_json(&deps)?)
        .bind(task.created_at.to_rfc3339())
        .bind(task.completed_at.map(|t| t.to_rfc3339()))
        .bind(&task.result)
        .bind(&task.kind)
        .bind(task.required_skills.as_ref().map(to_json).transpose()?)
        .bind(i64::from(task.priority))
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    async fn get_task(&self, id: Uuid) -> DomainResult<Option<TeamTask>> {
        let row: Option<TaskRow> = sqlx::query_as(
            "SELECT id, team_id, session_id, assignee_member_id, title, description, status, \
             dependencies, created_at, completed_at, result, kind, required_skills, priority \
             FROM team_tasks WHERE id = ?1",
        )
        .bind(id.to_string())
        .fetch_optional(&self.pool)
        .await?;
        row.map(TaskRow::into_task).transpose()
    }

    async fn update_task(&self, task: &TeamTask) -> DomainResult<()> {
        let deps: Vec<String> = task.dependencies.iter().map(|d| d.to_string()).collect();
        let result = sqlx::query(
            "UPDATE team_tasks SET assignee_member_id = ?2, title = ?3, description = ?4, \
             status = ?5, dependencies = ?6, completed_at = ?7, result = ?8, kind = ?9, \
             required_skills = ?10, priority = ?11 WHERE id = ?1",
        )
        .bind(task.id.to_string())
        .bind(task.assignee_member_id.map(|m| m.to_string()))
        .bind(&task.title)
        .bind(&task.description)
        .bind(task.status.as_str())
        .bind(to_json(&deps)?)
        .bind(task.completed_at.map(|t| t.to_rfc3339()))
        .bind(&task.result)
        .bind(&task.kind)
        .bind(task.required_skills.as_ref().map(to_json).transpose()?)
        .bind(i64::from(task.priority))
        .execute(&self.pool)
        .await?;
        if result.rows_affected() == 0 {
            return Err(DomainError::not_found(format!("team task {}", task.id)));
        }
        Ok(())
    }

    async fn list_tasks(&self, team_id: Uuid) -> DomainResult<Vec<TeamTask>> {
        let rows: Vec<TaskRow> = sqlx::query_as(
            "SELECT id, team_id, session_id, assignee_member_id, title, description, status, \
             dependencies, created_at, completed_at, result, kind, required_skills, priority \
             FROM team_tasks WHERE team_id = ?1 ORDER BY created_at",
        )
        .bind(team_id.to_string())
        .fetch_all(&self.pool)
        .await?;
        rows.into_iter().map(TaskRow::into_task).collect()
    }

    async fn count_open_tasks(&self, member_id: Uuid) -> DomainResult<usize> {
        let row: (i64,) = sqlx::query_as(
            "SELECT COUNT(*) FROM team_tasks WHERE assignee_member_id = ?1 \
             AND status IN ('pending', 'in_progress')",
        )
        .bind(member_id.to_string())
        .fetch_one(&self.pool)
        .await?;
        Ok(row.0 as usize)
    }

    async fn list_tasks_by_status(
        &self,
        team_id: Uuid,
        status: TeamTaskStatus,
    ) -> DomainResult<Vec<TeamTask>> {
        let rows: Vec<TaskRow> = sqlx::query_as(
            "SELECT id, team_id, session_id, assignee_member_id, title, description, status, \
             dependencies, created_at, completed_at, result, kind, required_skills, priority \
             FROM team_tasks WHERE team_id = ?1 AND status = ?2 ORDER BY created_at",
        )
        .bind(team_id.to_string())
        .bind(status.as_str())
        .fetch_all(&self.pool)
        .await?;
        rows.into_iter().map(TaskRow::into_task).collect()
    }

    async fn create_team_session(&self, session: &TeamSession) -> DomainResult<()> {
        sqlx::query(
            "INSERT INTO team_sessions (id, team_id, project_id, started_at, ended_at, \
             status, goal) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)",
        )
        .bind(session.id.to_string())
        .bind(session.team_id.to_string())
        .bind(session.project_id.to_string())
        .bind(session.started_at.to_rfc3339())
        .bind(session.ended_at.map(|t| t.to_rfc3339()))
        .bind(session.status.as_str())
        .bind(&session.goal)
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    async fn update_team_session(&self, session: &TeamSession) -> DomainResult<()> {
        let result = sqlx::query(
            "UPDATE team_sessions SET ended_at = ?2, status = ?3, goal = ?4 WHERE id = ?1",
        )
        .bind(session.id.to_string())
        .bind(session.ended_at.map(|t| t.to_rfc3339()))
        .bind(session.status.as_str())
        .bind(&session.goal)
        .execute(&self.pool)
        .await?;
        if result.rows_affected() == 0 {
            return Err(DomainError::not_found(format!("team session {}", session.id)));
        }
        Ok(())
    }

    async fn get_team_session(&self, id: Uuid) -> DomainResult<Option<TeamSession>> {
        let row: Option<TeamSessionRow> = sqlx::query_as(
            "SELECT id, team_id, project_id, started_at, ended_at, status, goal \
             FROM team_sessions WHERE id = ?1",
        )
        .bind(id.to_string())
        .fetch_optional(&self.pool)
        .await?;
        row.map(TeamSessionRow::into_session).transpose()
    }
}
