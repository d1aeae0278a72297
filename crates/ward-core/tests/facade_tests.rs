//! End-to-end tests through the `WardCore` embedding API.

use ward_core::{EntryForm, LifecycleConfig, PatientForm, PatientState, WardCore, WardError};

fn setup() -> (WardCore, String, String) {
    let _ = env_logger::builder().is_test(true).try_init();

    // Bootstrap: systems must exist before the config can point at one, so
    // open with a placeholder and rebuild once the guard system is known.
    let bootstrap = WardCore::open_in_memory(LifecycleConfig {
        default_system_id: String::new(),
    })
    .unwrap();
    let guard = bootstrap.register_system("Guard").unwrap();
    let icu = bootstrap.register_system("ICU").unwrap();

    let guard_room = bootstrap.register_room(&guard.system_id, 1).unwrap();
    bootstrap.register_bed(&guard_room.room_id, 1).unwrap();
    bootstrap.register_bed(&guard_room.room_id, 2).unwrap();
    let icu_room = bootstrap.register_room(&icu.system_id, 2).unwrap();
    bootstrap.register_bed(&icu_room.room_id, 1).unwrap();

    let core = bootstrap.with_config(LifecycleConfig {
        default_system_id: guard.system_id.clone(),
    });
    (core, guard.system_id, icu.system_id)
}

fn intake_form(dni: &str) -> PatientForm {
    PatientForm {
        name: "Ana".into(),
        lastname: "Suarez".into(),
        dni: dni.into(),
        ..PatientForm::default()
    }
}

#[test]
fn admit_transfer_discharge_round() {
    let (core, guard_id, icu_id) = setup();

    let patient = core
        .admit_patient(intake_form("100"), EntryForm::default())
        .unwrap();
    assert_eq!(patient.system_id, guard_id);

    let patient = core
        .transfer_patient(&patient.patient_id, &icu_id, "user-7")
        .unwrap();
    assert_eq!(patient.system_id, icu_id);

    let overview = core.patient_overview(&patient.patient_id).unwrap().unwrap();
    assert_eq!(overview.system_name, "ICU");
    assert_eq!(overview.bed_number, Some(1));

    let patient = core.discharge_patient(&patient.patient_id).unwrap();
    assert_eq!(patient.state, PatientState::Discharged);
    let overview = core.patient_overview(&patient.patient_id).unwrap().unwrap();
    assert_eq!(overview.bed_number, None);
}

#[test]
fn evolutions_through_facade() {
    let (core, _, _) = setup();
    let patient = core
        .admit_patient(intake_form("100"), EntryForm::default())
        .unwrap();

    // No hospitalization yet for an unknown patient
    let err = core.add_evolution("nope", "note").unwrap_err();
    assert!(matches!(err, WardError::NotFound(_)));

    core.add_evolution(&patient.patient_id, "stable on admission")
        .unwrap();
    core.add_evolution(&patient.patient_id, "fever down").unwrap();

    let latest = core.latest_evolutions(&patient.patient_id).unwrap();
    assert_eq!(latest.len(), 2);
    assert_eq!(latest[0].note, "fever down");
}

#[test]
fn staff_assignment_through_facade() {
    let (core, _, _) = setup();
    let patient = core
        .admit_patient(intake_form("100"), EntryForm::default())
        .unwrap();
    let medic = core
        .register_medic("Julia", "Roca", "jroca@hospital.test")
        .unwrap();
    let other = core
        .register_medic("Pedro", "Vega", "pvega@hospital.test")
        .unwrap();

    assert!(core.assign_medic(&patient.patient_id, &medic.medic_id).unwrap());
    assert!(core.has_medic(&patient.patient_id, &medic.medic_id).unwrap());

    let available = core.available_medics(&patient.patient_id).unwrap();
    assert_eq!(available.len(), 1);
    assert_eq!(available[0].medic_id, other.medic_id);

    assert!(core.unassign_medic(&patient.patient_id, &medic.medic_id).unwrap());
    assert!(core.medics_for_patient(&patient.patient_id).unwrap().is_empty());
}

#[test]
fn patient_update_and_json_export() {
    let (core, _, _) = setup();
    let ensurance = core.register_medical_ensurance("IOMA").unwrap();

    let patient = core
        .admit_patient(intake_form("100"), EntryForm::default())
        .unwrap();

    let mut form = intake_form("100");
    form.medical_ensurance_id = Some(ensurance.medical_ensurance_id.clone());
    form.phone = Some("2214437788".into());
    let patient = core.update_patient_data(&patient.patient_id, form).unwrap();
    assert_eq!(patient.phone.as_deref(), Some("2214437788"));

    let json = core.export_patients_json().unwrap();
    assert!(json.contains("\"dni\":\"100\""));
    assert!(json.contains("IOMA"));

    let by_state = core
        .patients_overview_by_state(PatientState::Hospitalized)
        .unwrap();
    assert_eq!(by_state.len(), 1);
}
