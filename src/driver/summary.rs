//! Result Summary
//!
//! 스트림 종료 SUCCESS 메타데이터에서 추출하는 결과 요약.
//! 메타데이터 키는 프로토콜 버전마다 다르므로 [`MetadataExtractor`]가
//! 버전별 추출 전략을 담당합니다.

use std::collections::HashMap;
use std::fmt;
use std::time::Duration;

use serde::Serialize;

use super::bookmark::Bookmark;
use super::dispatcher::Metadata;
use super::error::{DriverError, DriverResult};
use crate::bolt::{BoltVersion, Value, ABSENT_QUERY_ID};

// ============================================================================
// ResultSummary - 결과 요약
// ============================================================================

/// 결과 요약
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct ResultSummary {
    /// 쿼리 텍스트
    pub query: String,
    /// 쿼리 타입 (서버가 보내지 않으면 None)
    pub query_type: Option<QueryType>,
    /// 카운터
    pub counters: Counters,
    /// EXPLAIN 실행 계획
    pub plan: Option<Plan>,
    /// PROFILE 실행 계획
    pub profile: Option<ProfiledPlan>,
    /// 알림
    pub notifications: Vec<Notification>,
    /// 첫 레코드까지 걸린 시간
    pub result_available_after: Option<Duration>,
    /// 결과 소비까지 걸린 시간
    pub result_consumed_after: Option<Duration>,
    /// 데이터베이스 이름
    pub database: Option<String>,
    /// 서버 에이전트
    pub server: Option<String>,
}

impl ResultSummary {
    /// 실행 계획 존재 여부
    pub fn has_plan(&self) -> bool {
        self.plan.is_some() || self.profile.is_some()
    }
}

/// 쿼리 타입
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum QueryType {
    /// 읽기 전용 ("r")
    ReadOnly,
    /// 읽기/쓰기 ("rw")
    ReadWrite,
    /// 쓰기 전용 ("w")
    WriteOnly,
    /// 스키마 변경 ("s")
    SchemaWrite,
}

impl QueryType {
    /// 메타데이터 코드에서 변환
    pub fn from_code(code: &str) -> DriverResult<Self> {
        match code {
            "r" => Ok(Self::ReadOnly),
            "rw" => Ok(Self::ReadWrite),
            "w" => Ok(Self::WriteOnly),
            "s" => Ok(Self::SchemaWrite),
            other => Err(DriverError::protocol(format!("Unknown query type: '{}'", other))),
        }
    }

    /// 메타데이터 코드
    pub fn code(&self) -> &'static str {
        match self {
            Self::ReadOnly => "r",
            Self::ReadWrite => "rw",
            Self::WriteOnly => "w",
            Self::SchemaWrite => "s",
        }
    }
}

// ============================================================================
// Counters - 업데이트 카운터
// ============================================================================

/// 카운터
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct Counters {
    /// 생성된 노드 수
    pub nodes_created: i64,
    /// 삭제된 노드 수
    pub nodes_deleted: i64,
    /// 생성된 관계 수
    pub relationships_created: i64,
    /// 삭제된 관계 수
    pub relationships_deleted: i64,
    /// 설정된 속성 수
    pub properties_set: i64,
    /// 추가된 레이블 수
    pub labels_added: i64,
    /// 제거된 레이블 수
    pub labels_removed: i64,
    /// 생성된 인덱스 수
    pub indexes_added: i64,
    /// 제거된 인덱스 수
    pub indexes_removed: i64,
    /// 추가된 제약조건 수
    pub constraints_added: i64,
    /// 제거된 제약조건 수
    pub constraints_removed: i64,
    /// 시스템 업데이트 수
    pub system_updates: i64,
    contains_updates_flag: Option<bool>,
    contains_system_updates_flag: Option<bool>,
}

impl Counters {
    /// `stats` 맵에서 생성
    pub fn from_map(map: &HashMap<String, Value>) -> Self {
        let int = |key: &str| map.get(key).and_then(Value::as_int).unwrap_or(0);
        let flag = |key: &str| map.get(key).and_then(Value::as_bool);
        Self {
            nodes_created: int("nodes-created"),
            nodes_deleted: int("nodes-deleted"),
            relationships_created: int("relationships-created"),
            relationships_deleted: int("relationships-deleted"),
            properties_set: int("properties-set"),
            labels_added: int("labels-added"),
            labels_removed: int("labels-removed"),
            indexes_added: int("indexes-added"),
            indexes_removed: int("indexes-removed"),
            constraints_added: int("constraints-added"),
            constraints_removed: int("constraints-removed"),
            system_updates: int("system-updates"),
            contains_updates_flag: flag("contains-updates"),
            contains_system_updates_flag: flag("contains-system-updates"),
        }
    }

    /// 변경 사항 존재 여부
    pub fn contains_updates(&self) -> bool {
        self.contains_updates_flag.unwrap_or(
            self.nodes_created > 0
                || self.nodes_deleted > 0
                || self.relationships_created > 0
                || self.relationships_deleted > 0
                || self.properties_set > 0
                || self.labels_added > 0
                || self.labels_removed > 0
                || self.indexes_added > 0
                || self.indexes_removed > 0
                || self.constraints_added > 0
                || self.constraints_removed > 0,
        )
    }

    /// 시스템 변경 존재 여부
    pub fn contains_system_updates(&self) -> bool {
        self.contains_system_updates_flag
            .unwrap_or(self.system_updates > 0)
    }
}

// ============================================================================
// Plan / ProfiledPlan - 실행 계획
// ============================================================================

/// 실행 계획 노드
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Plan {
    /// 연산자 타입
    pub operator_type: String,
    /// 인자
    pub args: HashMap<String, Value>,
    /// 식별자
    pub identifiers: Vec<String>,
    /// 자식 계획
    pub children: Vec<Plan>,
}

impl Plan {
    /// 메타데이터 맵에서 생성 (`operatorType` 필수)
    pub fn from_map(map: &HashMap<String, Value>) -> Option<Self> {
        let operator_type = map.get("operatorType").and_then(Value::as_str)?.to_string();
        let children = child_maps(map).filter_map(Plan::from_map).collect();
        Some(Self {
            operator_type,
            args: args_of(map),
            identifiers: identifiers_of(map),
            children,
        })
    }
}

/// PROFILE 실행 계획 노드
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ProfiledPlan {
    /// 연산자 타입
    pub operator_type: String,
    /// 인자
    pub args: HashMap<String, Value>,
    /// 식별자
    pub identifiers: Vec<String>,
    /// DB 히트 수
    pub db_hits: i64,
    /// 처리한 행 수
    pub records: i64,
    /// 페이지 캐시 히트
    pub page_cache_hits: i64,
    /// 페이지 캐시 미스
    pub page_cache_misses: i64,
    /// 소요 시간 (서버 단위)
    pub time: i64,
    /// 자식 계획
    pub children: Vec<ProfiledPlan>,
}

impl ProfiledPlan {
    /// 메타데이터 맵에서 생성 (`operatorType` 필수)
    pub fn from_map(map: &HashMap<String, Value>) -> Option<Self> {
        let operator_type = map.get("operatorType").and_then(Value::as_str)?.to_string();
        let int = |key: &str| map.get(key).and_then(Value::as_int).unwrap_or(0);
        Some(Self {
            operator_type,
            args: args_of(map),
            identifiers: identifiers_of(map),
            db_hits: int("dbHits"),
            records: int("rows"),
            page_cache_hits: int("pageCacheHits"),
            page_cache_misses: int("pageCacheMisses"),
            time: int("time"),
            children: child_maps(map).filter_map(ProfiledPlan::from_map).collect(),
        })
    }
}

fn args_of(map: &HashMap<String, Value>) -> HashMap<String, Value> {
    map.get("args").and_then(Value::as_map).cloned().unwrap_or_default()
}

fn identifiers_of(map: &HashMap<String, Value>) -> Vec<String> {
    map.get("identifiers")
        .and_then(Value::as_list)
        .map(|list| {
            list.iter()
                .filter_map(|item| item.as_str().map(str::to_string))
                .collect()
        })
        .unwrap_or_default()
}

fn child_maps(map: &HashMap<String, Value>) -> impl Iterator<Item = &HashMap<String, Value>> {
    map.get("children")
        .and_then(Value::as_list)
        .unwrap_or(&[])
        .iter()
        .filter_map(Value::as_map)
}

// ============================================================================
// Notification - 알림
// ============================================================================

/// 알림 심각도 기본값
pub const DEFAULT_SEVERITY: &str = "N/A";

/// 서버 알림
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Notification {
    /// 코드
    pub code: String,
    /// 제목
    pub title: String,
    /// 설명
    pub description: String,
    /// 심각도 (없으면 "N/A")
    pub severity: String,
    /// 쿼리 내 위치
    pub position: Option<InputPosition>,
}

impl Notification {
    /// `notifications` 목록의 원소 하나를 변환
    pub fn from_value(value: &Value) -> DriverResult<Self> {
        let map = value.as_map().ok_or_else(|| {
            DriverError::protocol(format!("Notification must be a map, got {}", value.type_name()))
        })?;

        let severity = match map.get("severity") {
            Some(v) => required_str(v, "severity")?,
            None => DEFAULT_SEVERITY.to_string(),
        };
        let position = match map.get("position") {
            None | Some(Value::Null) => None,
            Some(v) => Some(InputPosition::from_value(v)?),
        };

        Ok(Self {
            code: required_str(field(map, "code")?, "code")?,
            title: required_str(field(map, "title")?, "title")?,
            description: required_str(field(map, "description")?, "description")?,
            severity,
            position,
        })
    }
}

impl fmt::Display for Notification {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "code={}, title={}, description={}, severity={}",
            self.code, self.title, self.description, self.severity
        )?;
        if let Some(position) = &self.position {
            write!(f, ", position={{{}}}", position)?;
        }
        Ok(())
    }
}

/// 쿼리 텍스트 내 위치
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct InputPosition {
    /// 오프셋 (0부터)
    pub offset: i64,
    /// 라인 (1부터)
    pub line: i64,
    /// 컬럼 (1부터)
    pub column: i64,
}

impl InputPosition {
    /// `offset`, `line`, `column`이 모두 있어야 함
    pub fn from_value(value: &Value) -> DriverResult<Self> {
        let map = value
            .as_map()
            .ok_or_else(|| DriverError::protocol("Notification position must be a map"))?;
        let int = |key: &str| {
            field(map, key)?.as_int().ok_or_else(|| {
                DriverError::protocol(format!("Notification position '{}' must be an integer", key))
            })
        };
        Ok(Self {
            offset: int("offset")?,
            line: int("line")?,
            column: int("column")?,
        })
    }
}

impl fmt::Display for InputPosition {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "offset={}, line={}, column={}", self.offset, self.line, self.column)
    }
}

fn field<'a>(map: &'a HashMap<String, Value>, key: &str) -> DriverResult<&'a Value> {
    map.get(key)
        .ok_or_else(|| DriverError::protocol(format!("Notification is missing '{}'", key)))
}

fn required_str(value: &Value, key: &str) -> DriverResult<String> {
    value
        .as_str()
        .map(str::to_string)
        .ok_or_else(|| DriverError::protocol(format!("Notification '{}' must be a string", key)))
}

/// 메타데이터의 `notifications` 목록 변환. 목록이 없으면 빈 벡터
pub fn extract_notifications(metadata: &Metadata) -> DriverResult<Vec<Notification>> {
    match metadata.get("notifications") {
        None | Some(Value::Null) => Ok(Vec::new()),
        Some(Value::List(items)) => items.iter().map(Notification::from_value).collect(),
        Some(other) => Err(DriverError::protocol(format!(
            "notifications must be a list, got {}",
            other.type_name()
        ))),
    }
}

// ============================================================================
// MetadataExtractor - 버전별 메타데이터 추출
// ============================================================================

/// 프로토콜 버전별 메타데이터 추출 전략
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MetadataExtractor {
    result_available_after_key: &'static str,
    result_consumed_after_key: &'static str,
    reads_database: bool,
}

impl MetadataExtractor {
    /// Bolt 3
    pub const V3: Self = Self {
        result_available_after_key: "result_available_after",
        result_consumed_after_key: "result_consumed_after",
        reads_database: false,
    };

    /// Bolt 4 이상
    pub const V4: Self = Self {
        result_available_after_key: "t_first",
        result_consumed_after_key: "t_last",
        reads_database: true,
    };

    /// 협상된 버전에 맞는 추출기
    pub fn for_version(version: BoltVersion) -> Self {
        if version.supports_bounded_pull() {
            Self::V4
        } else {
            Self::V3
        }
    }

    /// RUN SUCCESS의 컬럼 키
    pub fn extract_query_keys(&self, metadata: &Metadata) -> Vec<String> {
        identifiers_from(metadata.get("fields"))
    }

    /// RUN SUCCESS의 쿼리 ID. 없으면 -1
    pub fn extract_query_id(&self, metadata: &Metadata) -> i64 {
        metadata
            .get("qid")
            .and_then(Value::as_int)
            .unwrap_or(ABSENT_QUERY_ID)
    }

    /// RUN SUCCESS의 첫 레코드 대기 시간
    pub fn extract_result_available_after(&self, metadata: &Metadata) -> Option<Duration> {
        millis(metadata, self.result_available_after_key)
    }

    /// 북마크. 없거나 빈 문자열이면 None, 문자열이 아니면 프로토콜 오류
    pub fn extract_bookmark(&self, metadata: &Metadata) -> DriverResult<Option<Bookmark>> {
        match metadata.get("bookmark") {
            None | Some(Value::Null) => Ok(None),
            Some(Value::String(b)) if b.is_empty() => Ok(None),
            Some(Value::String(b)) => Ok(Some(Bookmark::new(b.as_str()))),
            Some(other) => Err(DriverError::protocol(format!(
                "bookmark must be a string, got {}",
                other
            ))),
        }
    }

    /// 서버 에이전트
    pub fn extract_server(&self, metadata: &Metadata) -> Option<String> {
        metadata.get("server").and_then(Value::as_str).map(str::to_string)
    }

    /// 스트림 종료 SUCCESS에서 결과 요약 추출
    pub fn extract_summary(
        &self,
        query: &str,
        result_available_after: Option<Duration>,
        metadata: &Metadata,
    ) -> DriverResult<ResultSummary> {
        let query_type = match metadata.get("type") {
            None | Some(Value::Null) => None,
            Some(Value::String(code)) => Some(QueryType::from_code(code)?),
            Some(other) => {
                return Err(DriverError::protocol(format!(
                    "query type must be a string, got {}",
                    other.type_name()
                )))
            }
        };
        let counters = metadata
            .get("stats")
            .and_then(Value::as_map)
            .map(Counters::from_map)
            .unwrap_or_default();
        let plan = metadata.get("plan").and_then(Value::as_map).and_then(Plan::from_map);
        let profile = metadata
            .get("profile")
            .and_then(Value::as_map)
            .and_then(ProfiledPlan::from_map);
        let database = if self.reads_database {
            metadata.get("db").and_then(Value::as_str).map(str::to_string)
        } else {
            None
        };

        Ok(ResultSummary {
            query: query.to_string(),
            query_type,
            counters,
            plan,
            profile,
            notifications: extract_notifications(metadata)?,
            result_available_after,
            result_consumed_after: millis(metadata, self.result_consumed_after_key),
            database,
            server: self.extract_server(metadata),
        })
    }
}

fn identifiers_from(value: Option<&Value>) -> Vec<String> {
    value
        .and_then(Value::as_list)
        .map(|list| {
            list.iter()
                .filter_map(|item| item.as_str().map(str::to_string))
                .collect()
        })
        .unwrap_or_default()
}

fn millis(metadata: &Metadata, key: &str) -> Option<Duration> {
    metadata
        .get(key)
        .and_then(Value::as_int)
        .filter(|ms| *ms >= 0)
        .map(|ms| Duration::from_millis(ms as u64))
}

// ============================================================================
// Tests
// ============================================================================
