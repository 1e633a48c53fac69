//! Initial migration for the workflow engine schema.
//!
//! Creates the workflow tables, the users read model with the seeded
//! system workflow user, and the polled event queue.

use sea_orm_migration::prelude::*;

#[derive(DeriveMigrationName)]
pub struct Migration;

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        let db = manager.get_connection();
        db.execute_unprepared(INITIAL_SQL).await?;
        Ok(())
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        let db = manager.get_connection();
        db.execute_unprepared(
            "DROP TABLE IF EXISTS queued_events, workflow_approvals, workflow_audits, \
             workflow_event_history, workflow_entities, workflows, users CASCADE;",
        )
        .await?;
        Ok(())
    }
}

const INITIAL_SQL: &str = r"
-- Users read model. The engine only reads this table; the seeded system
-- workflow user is the actor recorded on automatic transitions.
CREATE TABLE users (
    id UUID PRIMARY KEY DEFAULT gen_random_uuid(),
    email VARCHAR(255) NOT NULL UNIQUE,
    is_system BOOLEAN NOT NULL DEFAULT FALSE,
    created_at TIMESTAMPTZ NOT NULL DEFAULT now()
);

INSERT INTO users (id, email, is_system)
VALUES ('00000000-0000-0000-0000-000000000001', 'system-workflow@granary.internal', TRUE);

-- Workflow instances
CREATE TABLE workflows (
    id UUID PRIMARY KEY DEFAULT gen_random_uuid(),
    workflow_kind VARCHAR(64) NOT NULL,
    current_state VARCHAR(64) NOT NULL,
    is_active BOOLEAN NOT NULL DEFAULT TRUE,
    created_at TIMESTAMPTZ NOT NULL DEFAULT now(),
    updated_at TIMESTAMPTZ NOT NULL DEFAULT now()
);

-- Index for active-instance lookups by kind
CREATE INDEX idx_workflows_kind_active ON workflows(workflow_kind) WHERE is_active;

-- Entity references governed by a workflow
CREATE TABLE workflow_entities (
    id UUID PRIMARY KEY DEFAULT gen_random_uuid(),
    workflow_id UUID NOT NULL REFERENCES workflows(id) ON DELETE CASCADE,
    entity_kind VARCHAR(64) NOT NULL,
    entity_id UUID NOT NULL,
    created_at TIMESTAMPTZ NOT NULL DEFAULT now(),
    CONSTRAINT uq_workflow_entity UNIQUE (workflow_id, entity_kind, entity_id)
);

-- Index for the single-active-instance check (entity -> workflows)
CREATE INDEX idx_workflow_entities_entity ON workflow_entities(entity_kind, entity_id);

-- Append-only record of accepted external events
CREATE TABLE workflow_event_history (
    event_id UUID PRIMARY KEY,
    workflow_id UUID NOT NULL REFERENCES workflows(id) ON DELETE CASCADE,
    event_data JSONB NOT NULL,
    sent_at TIMESTAMPTZ NOT NULL DEFAULT now()
);

CREATE INDEX idx_event_history_workflow ON workflow_event_history(workflow_id, sent_at);

-- Append-only audit trail, one row per transition edge
CREATE TABLE workflow_audits (
    id UUID PRIMARY KEY DEFAULT gen_random_uuid(),
    workflow_id UUID NOT NULL REFERENCES workflows(id) ON DELETE CASCADE,
    event_id UUID NOT NULL,
    acting_user_id UUID NOT NULL REFERENCES users(id),
    transition_event VARCHAR(64) NOT NULL,
    source_state VARCHAR(64) NOT NULL,
    target_state VARCHAR(64) NOT NULL,
    metadata JSONB NOT NULL DEFAULT '{}'::jsonb,
    created_at TIMESTAMPTZ NOT NULL DEFAULT now()
);

CREATE INDEX idx_audits_workflow ON workflow_audits(workflow_id, created_at);
CREATE INDEX idx_audits_event ON workflow_audits(event_id);

-- Approval records, written by the external submission path
CREATE TABLE workflow_approvals (
    id UUID PRIMARY KEY DEFAULT gen_random_uuid(),
    workflow_id UUID NOT NULL REFERENCES workflows(id) ON DELETE CASCADE,
    event_id UUID NOT NULL,
    approval_type VARCHAR(64) NOT NULL,
    approving_user_id UUID NOT NULL REFERENCES users(id),
    response_type VARCHAR(16) NOT NULL,
    is_still_valid BOOLEAN NOT NULL DEFAULT TRUE,
    created_at TIMESTAMPTZ NOT NULL DEFAULT now(),
    CONSTRAINT chk_response_type CHECK (response_type IN ('approve', 'reject'))
);

-- Index for gate evaluation (most common read)
CREATE INDEX idx_approvals_gate ON workflow_approvals(workflow_id, approval_type)
    WHERE is_still_valid;

-- Polled event queue, written by the external enqueue path
CREATE TABLE queued_events (
    id UUID PRIMARY KEY DEFAULT gen_random_uuid(),
    payload JSONB NOT NULL,
    status VARCHAR(16) NOT NULL DEFAULT 'pending',
    attempts INTEGER NOT NULL DEFAULT 0,
    available_at TIMESTAMPTZ NOT NULL DEFAULT now(),
    last_error TEXT,
    created_at TIMESTAMPTZ NOT NULL DEFAULT now(),
    updated_at TIMESTAMPTZ NOT NULL DEFAULT now(),
    CONSTRAINT chk_queue_status CHECK (status IN ('pending', 'done', 'dead'))
);

-- Index for batch claims
CREATE INDEX idx_queue_claim ON queued_events(available_at, created_at) WHERE status = 'pending';
";
