use chatrelay_agents::{ChatMessage, CompletionGateway, CompletionRequest, OpenAiGateway};
use chatrelay_common::Role;
use serde_json::json;
use wiremock::matchers::{body_partial_json, header, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

fn request(messages: Vec<ChatMessage>) -> CompletionRequest {
    CompletionRequest {
        model: "gpt-3.5-turbo".to_string(),
        messages,
        max_tokens: None,
        temperature: None,
    }
}

#[tokio::test]
async fn test_openai_completion_returns_choices_and_usage() {
    let mock_server = MockServer::start().await;

    let response_body = json!({
        "id": "chatcmpl-123",
        "object": "chat.completion",
        "created": 1677652288,
        "model": "gpt-3.5-turbo-0301",
        "choices": [{
            "index": 0,
            "message": {
                "role": "assistant",
                "content": "alice: hello!",
            },
            "finish_reason": "stop"
        }],
        "usage": {
            "prompt_tokens": 9,
            "completion_tokens": 12,
            "total_tokens": 21
        }
    });

    Mock::given(method("POST"))
        .and(path("/chat/completions"))
        .and(header("authorization", "Bearer test-key"))
        .and(body_partial_json(json!({
            "model": "gpt-3.5-turbo",
            "messages": [
                {"role": "system", "content": "be concise"},
                {"role": "user", "content": "alice: hi"}
            ]
        })))
        .respond_with(ResponseTemplate::new(200).set_body_json(response_body))
        .mount(&mock_server)
        .await;

    let gateway = OpenAiGateway::new("test-key".to_string(), Some(mock_server.uri()));
    let completion = gateway
        .complete(&request(vec![
            ChatMessage::system("be concise"),
            ChatMessage::user("alice: hi"),
        ]))
        .await
        .unwrap();

    assert_eq!(completion.choices.len(), 1);
    assert_eq!(completion.choices[0].role, Role::Assistant);
    assert_eq!(completion.choices[0].content, "alice: hello!");
    assert_eq!(completion.usage.prompt_tokens, 9);
    assert_eq!(completion.usage.completion_tokens, 12);
    assert_eq!(completion.usage.total_tokens, 21);
}

#[tokio::test]
async fn test_openai_multiple_choices_keep_order() {
    let mock_server = MockServer::start().await;

    let response_body = json!({
        "model": "gpt-3.5-turbo",
        "choices": [
            {"index": 0, "message": {"role": "assistant", "content": "first"}, "finish_reason": "stop"},
            {"index": 1, "message": {"role": "assistant", "content": "second"}, "finish_reason": "stop"}
        ],
        "usage": {"prompt_tokens": 1, "completion_tokens": 2, "total_tokens": 3}
    });

    Mock::given(method("POST"))
        .and(path("/chat/completions"))
        .respond_with(ResponseTemplate::new(200).set_body_json(response_body))
        .mount(&mock_server)
        .await;

    let gateway = OpenAiGateway::new("test-key".to_string(), Some(mock_server.uri()));
    let completion = gateway
        .complete(&request(vec![ChatMessage::user("bob: hey")]))
        .await
        .unwrap();

    let contents: Vec<_> = completion.choices.iter().map(|c| c.content.as_str()).collect();
    assert_eq!(contents, vec!["first", "second"]);
}

#[tokio::test]
async fn test_openai_api_error_surfaces_as_agent_error() {
    let mock_server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/chat/completions"))
        .respond_with(
            ResponseTemplate::new(429).set_body_json(json!({"error": {"message": "rate limited"}})),
        )
        .mount(&mock_server)
        .await;

    let gateway = OpenAiGateway::new("test-key".to_string(), Some(mock_server.uri()));
    let err = gateway
        .complete(&request(vec![ChatMessage::user("bob: hey")]))
        .await
        .unwrap_err();

    let text = err.to_string();
    assert!(text.contains("429"), "unexpected error: {text}");
    assert!(text.contains("rate limited"), "unexpected error: {text}");
}

#[tokio::test]
async fn test_openai_no_choices_is_error() {
    let mock_server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/chat/completions"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "model": "gpt-3.5-turbo",
            "choices": [],
            "usage": {"prompt_tokens": 1, "completion_tokens": 0, "total_tokens": 1}
        })))
        .mount(&mock_server)
        .await;

    let gateway = OpenAiGateway::new("test-key".to_string(), Some(mock_server.uri()));
    let result = gateway
        .complete(&request(vec![ChatMessage::user("bob: hey")]))
        .await;

    assert!(result.is_err());
}

#[tokio::test]
async fn test_openai_health_check() {
    let mock_server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/models"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"data": []})))
        .mount(&mock_server)
        .await;

    let gateway = OpenAiGateway::new("test-key".to_string(), Some(mock_server.uri()));
    assert!(gateway.health_check().await.unwrap());

    let unreachable = OpenAiGateway::new("k".to_string(), Some("http://127.0.0.1:1".to_string()));
    assert!(!unreachable.health_check().await.unwrap());
}
