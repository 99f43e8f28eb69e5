// tests/portal_tests.rs

use chrono::NaiveDate;
use serde_json::json;

use surakshasetu::error::AppError;
use surakshasetu::models::announcement::CreateAnnouncementRequest;
use surakshasetu::models::attendance::AttendanceStatus;
use surakshasetu::models::incident::CreateIncidentRequest;
use surakshasetu::models::schedule::CreateScheduleRequest;
use surakshasetu::models::task::CreateTaskRequest;
use surakshasetu::models::training::CreateTrainingVideoRequest;
use surakshasetu::services::{
    announcements, attendance, incidents, profiles, schedules, tasks::TaskRepository, training,
};
use surakshasetu::store::memory::MemoryStore;
use surakshasetu::store::{Collection, Query, RecordStore, SessionUser};

async fn store_with_guards() -> MemoryStore {
    let store = MemoryStore::new();
    for (id, full_name, role) in [
        ("guard-1", "Ravi Kumar", "guard"),
        ("guard-2", "Sunita Sharma", "guard"),
        ("admin-1", "Site Admin", "admin"),
    ] {
        store
            .insert(
                Collection::Profiles,
                json!({ "id": id, "full_name": full_name, "role": role }),
            )
            .await
            .expect("Failed to seed profile");
    }
    store
}

fn date(text: &str) -> NaiveDate {
    text.parse().expect("valid date")
}

#[tokio::test]
async fn guard_listing_excludes_admins() {
    // Arrange
    let store = store_with_guards().await;

    // Act
    let guards = profiles::list_guards(&store).await.unwrap();

    // Assert
    assert_eq!(guards.len(), 2);
    assert!(guards.iter().all(|g| g.role == "guard"));

    let hits = profiles::filter_by_name(&guards, "rav");
    assert_eq!(hits.len(), 1);
    assert_eq!(hits[0].full_name, "Ravi Kumar");
}

#[tokio::test]
async fn announcement_message_is_sanitized() {
    // Arrange
    let store = MemoryStore::new();

    // Act
    let posted = announcements::post_announcement(
        &store,
        CreateAnnouncementRequest {
            message: "Stay alert <script>alert(1)</script>tonight".to_string(),
            title: None,
        },
    )
    .await
    .unwrap();

    // Assert: the script tag and its payload are gone
    assert!(!posted.message.contains("script"));
    assert!(!posted.message.contains("alert(1)"));
    assert!(posted.message.contains("Stay alert"));
}

#[tokio::test]
async fn blank_announcement_is_rejected_locally() {
    // Arrange
    let store = MemoryStore::new();

    // Act
    let result = announcements::post_announcement(
        &store,
        CreateAnnouncementRequest {
            message: "   ".to_string(),
            title: None,
        },
    )
    .await;

    // Assert: validation failed and nothing was written
    assert!(matches!(result, Err(AppError::ValidationFailed(_))));
    assert!(announcements::list_announcements(&store).await.unwrap().is_empty());
}

#[tokio::test]
async fn task_repository_round_trip() {
    // Arrange
    let store = MemoryStore::new();
    let repo = TaskRepository::new(&store);

    // Act
    let task = repo
        .add(CreateTaskRequest {
            guard_name: "Ravi Kumar".to_string(),
            task_title: "Night patrol".to_string(),
            description: "Patrol the east perimeter every hour".to_string(),
            deadline: date("2026-09-01"),
            location: "East gate".to_string(),
            priority: "High".to_string(),
            notes: None,
        })
        .await
        .unwrap();

    // Assert
    assert_eq!(task.status, "Pending");
    let listed = repo.list().await.unwrap();
    assert_eq!(listed.len(), 1);
    assert_eq!(listed[0].task_title, "Night patrol");

    repo.remove(task.id).await.unwrap();
    assert!(repo.list().await.unwrap().is_empty());

    // Removing again surfaces NotFound; the user asked explicitly
    assert!(matches!(
        repo.remove(task.id).await,
        Err(AppError::NotFound(_))
    ));
}

#[tokio::test]
async fn task_requires_all_mandatory_fields() {
    let store = MemoryStore::new();
    let repo = TaskRepository::new(&store);

    let result = repo
        .add(CreateTaskRequest {
            guard_name: String::new(),
            task_title: "x".to_string(),
            description: "y".to_string(),
            deadline: date("2026-09-01"),
            location: "z".to_string(),
            priority: "Medium".to_string(),
            notes: None,
        })
        .await;

    assert!(matches!(result, Err(AppError::ValidationFailed(_))));
    assert!(repo.list().await.unwrap().is_empty());
}

#[tokio::test]
async fn schedule_denormalizes_the_guard_name() {
    // Arrange
    let store = store_with_guards().await;

    // Act
    let duty = schedules::add_schedule(
        &store,
        CreateScheduleRequest {
            guard_id: "guard-2".to_string(),
            date: date("2026-08-30"),
            shift_time: "22:00 - 06:00".to_string(),
            location: "Main gate".to_string(),
        },
    )
    .await
    .unwrap();

    // Assert: the name came from the profile, not the caller
    assert_eq!(duty.guard_name, "Sunita Sharma");
}

#[tokio::test]
async fn roster_is_sorted_by_date_ascending() {
    // Arrange
    let store = store_with_guards().await;
    for day in ["2026-09-03", "2026-08-28", "2026-09-01"] {
        schedules::add_schedule(
            &store,
            CreateScheduleRequest {
                guard_id: "guard-1".to_string(),
                date: date(day),
                shift_time: "06:00 - 14:00".to_string(),
                location: "Lobby".to_string(),
            },
        )
        .await
        .unwrap();
    }

    // Act
    let roster = schedules::list_schedules(&store).await.unwrap();

    // Assert
    let days: Vec<String> = roster.iter().map(|d| d.date.to_string()).collect();
    assert_eq!(days, vec!["2026-08-28", "2026-09-01", "2026-09-03"]);
}

#[tokio::test]
async fn schedule_for_unknown_guard_fails() {
    let store = store_with_guards().await;

    let result = schedules::add_schedule(
        &store,
        CreateScheduleRequest {
            guard_id: "nobody".to_string(),
            date: date("2026-08-30"),
            shift_time: "22:00 - 06:00".to_string(),
            location: "Main gate".to_string(),
        },
    )
    .await;

    assert!(matches!(result, Err(AppError::NotFound(_))));
}

#[tokio::test]
async fn incident_with_photo_carries_a_public_url() {
    // Arrange
    let store = MemoryStore::new();

    // Act
    let incident = incidents::report_incident(
        &store,
        CreateIncidentRequest {
            guard_name: "Ravi Kumar".to_string(),
            description: "Broken lock on the storage room".to_string(),
        },
        Some(("lock.jpg", vec![0xff, 0xd8, 0xff])),
    )
    .await
    .unwrap();

    // Assert
    let url = incident.photo_url.expect("photo url recorded");
    assert!(url.contains("incident-photos"));
    assert!(url.ends_with(".jpg"));
}

#[tokio::test]
async fn incident_without_photo_is_fine() {
    let store = MemoryStore::new();

    let incident = incidents::report_incident(
        &store,
        CreateIncidentRequest {
            guard_name: "Ravi Kumar".to_string(),
            description: "Suspicious vehicle near gate 2".to_string(),
        },
        None,
    )
    .await
    .unwrap();

    assert!(incident.photo_url.is_none());

    let listed = incidents::list_incidents(&store).await.unwrap();
    assert_eq!(listed.len(), 1);
}

#[tokio::test]
async fn incident_photo_without_extension_is_rejected() {
    let store = MemoryStore::new();

    let result = incidents::report_incident(
        &store,
        CreateIncidentRequest {
            guard_name: "Ravi Kumar".to_string(),
            description: "desc".to_string(),
        },
        Some(("photo", vec![1, 2, 3])),
    )
    .await;

    assert!(matches!(result, Err(AppError::ValidationFailed(_))));
}

#[tokio::test]
async fn attendance_sheet_toggle_and_save() {
    // Arrange
    let store = MemoryStore::new();
    let mut sheet = attendance::AttendanceSheet::new(date("2026-08-23"));

    // Toggling the same status twice clears the mark
    sheet.toggle("Ravi Kumar", AttendanceStatus::Present);
    sheet.toggle("Ravi Kumar", AttendanceStatus::Present);
    assert_eq!(sheet.status_of("Ravi Kumar"), None);

    // Switching status overwrites
    sheet.toggle("Ravi Kumar", AttendanceStatus::Present);
    sheet.toggle("Ravi Kumar", AttendanceStatus::Absent);
    assert_eq!(sheet.status_of("Ravi Kumar"), Some(AttendanceStatus::Absent));

    sheet.toggle("Sunita Sharma", AttendanceStatus::Present);

    // Act
    let saved = sheet.save(&store, "Admin").await.unwrap();

    // Assert: one row per marked guard, and the sheet is cleared
    assert_eq!(saved, 2);
    assert_eq!(sheet.marked_count(), 0);

    let rows = store.fetch(Collection::Attendance, Query::new()).await.unwrap();
    assert_eq!(rows.len(), 2);
}

#[tokio::test]
async fn empty_attendance_sheet_cannot_be_saved() {
    let store = MemoryStore::new();
    let mut sheet = attendance::AttendanceSheet::new(date("2026-08-23"));

    let result = sheet.save(&store, "Admin").await;

    assert!(matches!(result, Err(AppError::ValidationFailed(_))));
}

#[tokio::test]
async fn guard_sees_their_own_attendance_newest_first() {
    // Arrange
    let store = MemoryStore::new();
    store.sign_in(SessionUser {
        id: "guard-2".to_string(),
        email: "sunita@surakshasetu.example".to_string(),
    });

    let mut first = attendance::AttendanceSheet::new(date("2026-08-20"));
    first.toggle("Sunita Sharma", AttendanceStatus::Present);
    first.toggle("Ravi Kumar", AttendanceStatus::Present);
    first.save(&store, "Admin").await.unwrap();

    let mut second = attendance::AttendanceSheet::new(date("2026-08-22"));
    second.toggle("Sunita Sharma", AttendanceStatus::Absent);
    second.save(&store, "Admin").await.unwrap();

    // Act: matched by the name part of the email, case-insensitively
    let history = attendance::my_history(&store).await.unwrap();

    // Assert
    assert_eq!(history.len(), 2);
    assert_eq!(history[0].date, date("2026-08-22"));
    assert_eq!(history[0].status, AttendanceStatus::Absent);
    assert_eq!(history[1].date, date("2026-08-20"));
}

#[tokio::test]
async fn training_upload_records_the_public_url() {
    // Arrange
    let store = MemoryStore::new();

    // Act
    let video = training::upload_training_video(
        &store,
        CreateTrainingVideoRequest {
            title: "Fire drill basics".to_string(),
            description: Some("Evacuation routes and assembly points".to_string()),
        },
        "drill.mp4",
        vec![0, 0, 0, 24],
    )
    .await
    .unwrap();

    // Assert
    assert!(video.video_url.contains("training-videos"));
    assert!(video.video_url.ends_with(".mp4"));

    let listed = training::list_training_videos(&store).await.unwrap();
    assert_eq!(listed.len(), 1);
    assert_eq!(listed[0].title, "Fire drill basics");
}

#[tokio::test]
async fn training_upload_requires_a_title() {
    let store = MemoryStore::new();

    let result = training::upload_training_video(
        &store,
        CreateTrainingVideoRequest {
            title: String::new(),
            description: None,
        },
        "drill.mp4",
        vec![1],
    )
    .await;

    assert!(matches!(result, Err(AppError::ValidationFailed(_))));
    assert!(training::list_training_videos(&store).await.unwrap().is_empty());
}
