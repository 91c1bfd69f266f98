mod common;

use common::*;
use genesisapi::{
    Cache, CacheKey, ColumnData, FileCache, GenesisError, HttpResponse, Params, RenameOptions,
    params,
};

const CUBE: &str = "\
K;DQ;FACH-SCHL;GHH-ART
D;22922KJ114;OHNE
K;DQA;NAME;RHF-BSR;RHF-ACHSE
D;ELGAT2;1;2
D;KREISE;1;1
K;DQZ;NAME;ZI-RHF-BSR
D;JAHR;3
K;DQI;NAME;ZI-RHF-BSR;DST;NKM-STELLEN
D;ELG002;4;GANZ;0
D;ELG003;5;FEST;2
K;QEI;FACH-SCHL;FACH-SCHL;ZI-WERT;WERT;QUALITAET;GESPERRT;WERT-VERFAELSCHT
D;01001;ELGAT2A;2020;1200;e;;0;1.25;e;;0
D;01002;ELGAT2A;2020;800;e;;0;0.75;e;;0
";

#[test]
fn cube_is_decoded_renamed_and_typed() {
    let clock = FakeClock::new();
    let (transport, calls) = FakeTransport::new(&clock, |path, _, _| {
        assert_eq!(path, "data/cubefile");
        HttpResponse::ok(CUBE)
    });
    let client = client(transport, &clock);

    let table = client
        .cube("22922KJ114", &Params::new(), &RenameOptions::default())
        .unwrap();

    assert_eq!(
        table.column_names(),
        vec![
            "KREISE",
            "ELGAT2",
            "JAHR",
            "ELG002_WERT",
            "ELG002_QUALITAET",
            "ELG002_GESPERRT",
            "ELG002_WERT-VERFAELSCHT",
            "ELG003_WERT",
            "ELG003_QUALITAET",
            "ELG003_GESPERRT",
            "ELG003_WERT-VERFAELSCHT",
        ]
    );
    assert_eq!(
        table.column("ELG002_WERT").unwrap().data,
        ColumnData::Integer(vec![1200, 800])
    );
    assert_eq!(
        table.column("ELG003_WERT").unwrap().data,
        ColumnData::Float(vec![1.25, 0.75])
    );
    assert_eq!(table.height(), 2);

    let call = &calls.borrow()[0];
    assert_eq!(call.params["name"], "22922KJ114");
    assert_eq!(call.params["area"], "all");
    assert_eq!(call.params["password"], "secret");
}

#[test]
fn data_is_written_through_and_served_from_the_cache() {
    let tmp = tempfile::tempdir().unwrap();
    let clock = FakeClock::new();
    let (transport, calls) = FakeTransport::new(&clock, |_, _, _| HttpResponse::ok(CUBE));
    let client = client(transport, &clock).with_cache(FileCache::new(tmp.path()));

    let first = client.cubefile("22922KJ114", &Params::new()).unwrap();
    let second = client.cubefile("22922KJ114", &Params::new()).unwrap();
    assert_eq!(first, CUBE);
    assert_eq!(second, CUBE);
    assert_eq!(calls.borrow().len(), 1);

    // credentials are not part of the key
    let key = CacheKey::new(
        "22922KJ114",
        "data",
        "cubefile",
        &params([("name", "22922KJ114"), ("area", "all")]),
    );
    assert!(FileCache::new(tmp.path()).has(&key));

    // other parameters miss the cache
    client
        .cubefile("22922KJ114", &params([("startyear", "2019")]))
        .unwrap();
    assert_eq!(calls.borrow().len(), 2);
}

#[test]
fn catalogue_requests_are_not_cached() {
    let tmp = tempfile::tempdir().unwrap();
    let clock = FakeClock::new();
    let (transport, calls) = FakeTransport::new(&clock, |_, _, _| {
        status(0, "Information", "Es wurden Objekte gefunden.")
    });
    let client = client(transport, &clock).with_cache(FileCache::new(tmp.path()));

    let p = params([("name", "12411"), ("selection", "*")]);
    let value = client.catalogue("cubes2statistic", &p).unwrap();
    client.catalogue("cubes2statistic", &p).unwrap();
    assert_eq!(value["Status"]["Code"], 0);
    assert_eq!(calls.borrow().len(), 2);
}

#[test]
fn service_errors_carry_the_service_message() {
    let clock = FakeClock::new();
    let (transport, _) = FakeTransport::new(&clock, |path, _, _| match path {
        "data/cubefile" => status(104, "Fehler", "Es gibt keine Objekte zum angegebenen Selektionskriterium."),
        "data/tablefile" => status(-1, "Fehler", "Systemfehler"),
        _ => status(0, "Error", "kaputt"),
    });
    let client = client(transport, &clock);

    match client.cubefile("NOPE", &Params::new()) {
        Err(GenesisError::ServiceQuery(msg)) => assert!(msg.starts_with("Es gibt keine Objekte")),
        other => panic!("unexpected {other:?}"),
    }
    assert!(matches!(
        client.tablefile("12411-0001", &Params::new()),
        Err(GenesisError::ServiceSystem(msg)) if msg == "Systemfehler"
    ));
    assert!(matches!(
        client.metadata("cube", "X"),
        Err(GenesisError::ServiceQuery(msg)) if msg == "kaputt"
    ));
}

#[test]
fn error_status_with_null_fields_is_not_cached() {
    let tmp = tempfile::tempdir().unwrap();
    let clock = FakeClock::new();
    let (transport, calls) = FakeTransport::new(&clock, |_, _, _| {
        HttpResponse::ok(r#"{"Status": {"Code": 104, "Type": "Fehler", "Content": null}}"#)
    });
    let client = client(transport, &clock).with_cache(FileCache::new(tmp.path()));

    for _ in 0..2 {
        assert!(matches!(
            client.cubefile("NOPE", &Params::new()),
            Err(GenesisError::ServiceQuery(_))
        ));
    }
    assert_eq!(calls.borrow().len(), 2);

    let key = CacheKey::new("NOPE", "data", "cubefile", &params([("name", "NOPE"), ("area", "all")]));
    assert!(!FileCache::new(tmp.path()).has(&key));
}

#[test]
fn null_status_code_is_a_system_error() {
    let clock = FakeClock::new();
    let (transport, _) = FakeTransport::new(&clock, |_, _, _| {
        HttpResponse::ok(r#"{"Status": {"Code": null, "Type": "Information", "Content": null}}"#)
    });
    let client = client(transport, &clock);
    assert!(matches!(
        client.tablefile("12411-0001", &Params::new()),
        Err(GenesisError::ServiceSystem(_))
    ));
}

#[test]
fn table_is_parsed_from_ffcsv() {
    let clock = FakeClock::new();
    let (transport, calls) = FakeTransport::new(&clock, |path, _, _| {
        assert_eq!(path, "data/tablefile");
        HttpResponse::ok(
            "statistics_code;time;value_variable_code;value\n\
             12411;2022;BEVSTD;84358845\n\
             12411;2023;BEVSTD;84669326\n",
        )
    });
    let client = client(transport, &clock);

    let table = client
        .table("12411-0001", &params([("startyear", "2022")]))
        .unwrap();
    assert_eq!(table.height(), 2);
    assert_eq!(
        table.column("value").unwrap().data,
        ColumnData::Integer(vec![84358845, 84669326])
    );
    assert_eq!(
        table.column("value_variable_code").unwrap().data,
        ColumnData::Text(vec!["BEVSTD".into(), "BEVSTD".into()])
    );

    let call = &calls.borrow()[0];
    assert_eq!(call.params["format"], "ffcsv");
    assert_eq!(call.params["startyear"], "2022");
}

#[test]
fn changed_password_is_used_afterwards() {
    let clock = FakeClock::new();
    let (transport, calls) = FakeTransport::new(&clock, |path, _, _| match path {
        "profile/password" => status(0, "Information", "Passwort wurde geändert."),
        _ => HttpResponse::ok(r#"{"Status": "Sie wurden erfolgreich an- und abgemeldet!"}"#),
    });
    let mut client = client(transport, &clock);

    client.change_password("n3u").unwrap();
    client.logincheck().unwrap();
    assert_eq!(client.config().password, "n3u");

    let calls = calls.borrow();
    assert_eq!(calls[0].path, "profile/password");
    assert_eq!(calls[0].params["new"], "n3u");
    assert_eq!(calls[0].params["repeat"], "n3u");
    assert_eq!(calls[0].params["password"], "secret");
    assert_eq!(calls[1].params["password"], "n3u");
}

#[test]
fn rejected_password_change_keeps_the_old_one() {
    let clock = FakeClock::new();
    let (transport, _) = FakeTransport::new(&clock, |_, _, _| {
        status(0, "Fehler", "Das neue Passwort ist zu kurz.")
    });
    let mut client = client(transport, &clock);
    assert!(client.change_password("x").is_err());
    assert_eq!(client.config().password, "secret");
}

#[test]
fn warnings_do_not_interrupt() {
    let clock = FakeClock::new();
    let (transport, _) = FakeTransport::new(&clock, |_, _, _| {
        status(22, "Warnung", "Parameter wurden angepasst.")
    });
    let client = client(transport, &clock);
    let value = client.metadata("table", "12411-0001").unwrap();
    assert_eq!(value["Status"]["Content"], "Parameter wurden angepasst.");
}

#[test]
fn http_failures_are_transport_errors() {
    let clock = FakeClock::new();
    let (transport, _) = FakeTransport::new(&clock, |_, _, _| HttpResponse {
        status: 401,
        text: "Unauthorized".to_string(),
        headers: Vec::new(),
    });
    let client = client(transport, &clock);
    match client.tablefile("12411-0001", &Params::new()) {
        Err(GenesisError::Transport { status, url, message }) => {
            assert_eq!(status, 401);
            assert!(url.ends_with("/data/tablefile"));
            assert!(message.contains("Unauthorized"));
        }
        other => panic!("unexpected {other:?}"),
    }
}

#[test]
fn malformed_cube_is_a_decode_error() {
    let clock = FakeClock::new();
    let (transport, _) = FakeTransport::new(&clock, |_, _, _| HttpResponse::ok("Keine Daten\n"));
    let client = client(transport, &clock);
    assert!(matches!(
        client.cube("X", &Params::new(), &RenameOptions::default()),
        Err(GenesisError::Decode(_))
    ));
}

#[test]
fn helloworld_endpoints() {
    let clock = FakeClock::new();
    let (transport, calls) = FakeTransport::new(&clock, |path, _, _| match path {
        "helloworld/whoami" => HttpResponse::ok(r#"{"User-Agent": "x", "Client-IP": "127.0.0.1"}"#),
        // logincheck reuses `Status` as free text
        _ => HttpResponse::ok(r#"{"Status": "Sie wurden erfolgreich an- und abgemeldet!"}"#),
    });
    let client = client(transport, &clock);

    assert!(client.whoami().unwrap().contains("Client-IP"));
    assert!(client.logincheck().unwrap().contains("erfolgreich"));

    let calls = calls.borrow();
    assert!(calls[0].params.is_empty());
    assert_eq!(calls[1].params["username"], "tester");
}

#[test]
fn remove_result_passes_area() {
    let clock = FakeClock::new();
    let (transport, calls) =
        FakeTransport::new(&clock, |_, _, _| status(0, "Information", "Gelöscht."));
    let client = client(transport, &clock);
    client.remove_result("12411-0001_1", "user").unwrap();
    let call = &calls.borrow()[0];
    assert_eq!(call.path, "profile/removeresult");
    assert_eq!(call.params["area"], "user");
}
