use xmlrpc_core::{BoxcarRequest, Codec, Error, Fault, MethodCall, Request, Response, Value};

#[test]
fn fault_round_trips_with_markup_in_the_message() {
    let codec = Codec::default();
    let fault = Fault::new(-32601, "method <zone.info> & \"friends\" not found");

    let xml = codec.encode_response(&Response::Fault(fault.clone())).unwrap();
    let back = codec.decode_response(xml.as_bytes()).unwrap();

    assert!(back.is_fault());
    assert_eq!(Some(-32601), back.fault_code());
    assert_eq!(Some(fault.message.as_str()), back.fault_string());
    match back.result::<Value>() {
        Err(Error::Fault(decoded)) => assert_eq!(fault, decoded),
        other => panic!("unexpected {:?}", other),
    }
}

#[test]
fn boxcar_serializes_children_in_append_order() {
    let codec = Codec::default();
    let mut boxcar = BoxcarRequest::new()
        .call(Request::new("domain.info").argument("example.com"))
        .call(Request::new("domain.zone.list"));

    let first = codec.decode_request(codec.encode_request(&boxcar).unwrap().as_bytes()).unwrap();
    assert_eq!("system.multiCall", first.method_name);
    assert_eq!(2, first.params.len());

    boxcar.push(Request::new("domain.zone.version.list").argument(&7));
    let second = codec.decode_request(codec.encode_request(&boxcar).unwrap().as_bytes()).unwrap();

    let names: Vec<&str> = second.params.iter().filter_map(|p| p["methodName"].as_str()).collect();
    assert_eq!(vec!["domain.info", "domain.zone.list", "domain.zone.version.list"], names);
    assert_eq!(Value::Array(vec![Value::from("example.com")]), second.params[0]["params"]);
    assert_eq!(Value::Array(vec![Value::Integer(7)]), second.params[2]["params"]);
}

#[test]
fn nested_boxcar_is_one_child_struct() {
    let inner = BoxcarRequest::new().call(Request::new("a")).call(Request::new("b"));
    let outer = BoxcarRequest::new().call(Request::new("first")).call(inner);

    let params = outer.params();
    assert_eq!(2, params.len());
    assert_eq!(Value::from("first"), params[0]["methodName"]);
    assert_eq!(Value::from("system.multiCall"), params[1]["methodName"]);
    let nested: Vec<&str> = params[1]["params"]
        .as_array()
        .unwrap()
        .iter()
        .filter_map(|p| p["methodName"].as_str())
        .collect();
    assert_eq!(vec!["a", "b"], nested);
}

#[test]
fn server_side_decoding_splits_the_method_name() {
    let xml = "<?xml version=\"1.0\"?>\n\
               <methodCall>\n\
                 <methodName>domain.zone.record.list</methodName>\n\
                 <params>\n\
                   <param><value><string>apikey</string></value></param>\n\
                   <param><value><i4>42</i4></value></param>\n\
                 </params>\n\
               </methodCall>\n";
    let request = Codec::default().decode_request(xml.as_bytes()).unwrap();

    assert_eq!("domain", request.object_name());
    assert_eq!("zone.record.list", request.method());
    assert_eq!("apikey", request.param::<String>(0).unwrap());
    assert_eq!(42, request.param::<i32>(1).unwrap());
}

#[test]
fn local_errors_can_be_answered_as_faults() {
    let codec = Codec::default();
    let err = codec.decode_request(b"<methodCall>").unwrap_err();
    let reply = Response::Fault(Fault::from_error(&err));

    let xml = codec.encode_response(&reply).unwrap();
    let back = codec.decode_response(xml.as_bytes()).unwrap();
    assert_eq!(Some(xmlrpc_core::error::PARSE_ERROR_CODE), back.fault_code());
}
